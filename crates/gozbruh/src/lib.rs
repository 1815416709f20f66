//! # gozbruh
//!
//! Round-trips meshes between a modeling host and a sculpting host while
//! keeping track of which object is which.
//!
//! ## Overview
//!
//! The two applications share nothing but a directory and a TCP link. A
//! transfer writes one file per object into the shared directory, then
//! sends the peer a manifest naming those files grouped by parent tool. The
//! peer imports every file and answers `loaded`.
//!
//! ## Identity
//!
//! - **Durable ID**: the `gozbruhBrushID` attribute, set to the object's
//!   name the first time it is sent.
//! - **Drift**: an object whose name no longer matches its ID (renamed,
//!   duplicated, or carrying another object's history) is not sent until
//!   the user picks Relink, Create or Skip.
//! - **Parent**: the `gozbruhParent` attribute groups objects under the
//!   sculpting host's tool.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use gozbruh::{Bridge, BridgeConfig, LogPresenter};
//! use gozbruh::host::MemoryMeshHost;
//!
//! async fn example() -> gozbruh::Result<()> {
//!     let bridge = Bridge::new(BridgeConfig::resolve()?);
//!     let host = Arc::new(MemoryMeshHost::new());
//!     host.add_object("Sphere1")?;
//!     host.select(&["Sphere1"]);
//!
//!     let conn = bridge.connect_to_sculpt();
//!     let mut sender = bridge.mesh_sender(host, Arc::new(LogPresenter));
//!     let report = sender.send(&conn).await?;
//!     println!("sent {} objects", report.manifest.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `gozbruh::core` - names, IDs, manifests, conflicts
//! - `gozbruh::host` - host traits and in-memory hosts
//! - `gozbruh::sync` - wire protocol, connections, listener

pub mod bridge;
pub mod command;
pub mod config;
pub mod conflict;
pub mod error;
pub mod identity;
pub mod orchestrator;
pub mod presenter;
pub mod receiver;
pub mod shared_dir;

// Re-export component crates
pub use gozbruh_core as core;
pub use gozbruh_host as host;
pub use gozbruh_sync as sync;

pub use bridge::Bridge;
pub use command::ShellSculptHost;
pub use config::BridgeConfig;
pub use conflict::{ConflictResolver, Outcome, Resolution};
pub use error::{BridgeError, Result};
pub use identity::{reconcile, Reconciliation};
pub use orchestrator::{send_artifacts, MeshSender, SculptSender, SendMode, TransferReport, TransferState};
pub use presenter::{LogPresenter, Presenter};
pub use receiver::{MeshReceiver, SculptReceiver};
pub use shared_dir::SharedDirectory;

// Re-export commonly used core types
pub use gozbruh_core::{Conflict, DurableId, ObjectName, UserChoice};
pub use gozbruh_sync::{Connection, NetworkEndpoint};
