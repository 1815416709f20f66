//! # gozbruh Host
//!
//! The interfaces gozbruh needs from the two applications it bridges.
//!
//! ## Overview
//!
//! Neither host exposes an object model the other understands. Everything
//! gozbruh does to a host goes through one of two async traits:
//!
//! - [`MeshHost`] - the modeling side: selection, attributes, rename,
//!   delete, construction history, export and import of mesh files
//! - [`SculptHost`] - the sculpting side: subtool iteration, export of the
//!   current subtool, import into a named tool
//!
//! [`MeshHostExt`] layers the identity attributes (`gozbruhBrushID`,
//! `gozbruhParent`) on top of the raw attribute calls.
//!
//! ## In-memory hosts
//!
//! [`MemoryMeshHost`] and [`MemorySculptHost`] keep their scene in memory
//! and write real files, so both directions of a transfer can be exercised
//! without either application running.
//!
//! ```rust,no_run
//! use gozbruh_host::{MemoryMeshHost, MeshHost, MeshHostExt};
//!
//! async fn example() {
//!     let host = MemoryMeshHost::new();
//!     let sphere = host.add_object("Sphere1").unwrap();
//!     host.select(&["Sphere1"]);
//!
//!     let selected = host.list_selected_mesh_objects().await.unwrap();
//!     assert_eq!(selected, vec![sphere.clone()]);
//!     assert!(host.durable_id(&sphere).await.unwrap().is_none());
//! }
//! ```

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{HostError, Result};
pub use memory::{HistoryNode, MemoryMeshHost, MemoryObject, MemorySculptHost, SculptImport};
pub use traits::{MeshHost, MeshHostExt, MeshRef, SculptHost, SubtoolRef};
