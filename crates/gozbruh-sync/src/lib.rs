//! # gozbruh Sync
//!
//! The wire protocol between the two hosts.
//!
//! ## Overview
//!
//! Each side runs a listener. A sender opens a [`Connection`] to the peer's
//! listener, probes it, then pushes one manifest per transfer and waits for
//! the peer to confirm that every object was imported.
//!
//! ## Framing
//!
//! Frames carry a 4-byte big-endian length prefix ([`FrameCodec`]). The
//! payload is a bare token (`check`, `ok`, `EXIT`, `loaded`) or a JSON
//! transfer message:
//!
//! ```text
//! {"command":"open","objData":{"<parent ID>":["<name>", ...]}}
//! ```
//!
//! ## Message Flow
//!
//! ```text
//! Sender                              Receiver
//!   |-------- check ------------------>|
//!   |<------- ok ----------------------|
//!   |-------- open {objData} --------->|
//!   |                                  |  import every object
//!   |<------- loaded ------------------|
//! ```
//!
//! Anything other than the expected reply, a closed socket or a timeout
//! drops the connection; the sender must open it again.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gozbruh_sync::{Connection, ConnectionConfig, NetworkEndpoint};
//! use gozbruh_core::ObjData;
//!
//! async fn example() -> gozbruh_sync::Result<()> {
//!     let endpoint = NetworkEndpoint::parse("localhost:6668")?;
//!     let conn = Connection::new(endpoint, ConnectionConfig::default());
//!     conn.open().await?;
//!
//!     let batch = ObjData::new(vec![("Sphere1".into(), vec!["Sphere1".into()])]);
//!     conn.send(batch).await?;
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod connection;
pub mod endpoint;
pub mod error;
pub mod messages;
pub mod server;

pub use codec::{FrameCodec, DEFAULT_MAX_FRAME_LENGTH};
pub use connection::{force_server_close, Connection, ConnectionConfig};
pub use endpoint::{NetworkEndpoint, DEFAULT_HOST};
pub use error::{Result, SyncError};
pub use messages::{Frame, WireMessage, LOADED, OPEN_COMMAND, PROBE, PROBE_ACK, SHUTDOWN};
pub use server::{ManifestHandler, RunningServer, Server};
