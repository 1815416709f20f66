//! Protocol frames.
//!
//! Every frame is a UTF-8 payload. Control frames are bare tokens; a
//! transfer is a JSON object. Inbound payloads are parsed into a [`Frame`]
//! before anything acts on them.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use gozbruh_core::ObjData;

use crate::error::{Result, SyncError};

/// Liveness probe, sender to receiver.
pub const PROBE: &str = "check";

/// Probe reply, receiver to sender.
pub const PROBE_ACK: &str = "ok";

/// Administrative shutdown, sender to receiver.
pub const SHUTDOWN: &str = "EXIT";

/// Delivery confirmation, receiver to sender.
pub const LOADED: &str = "loaded";

/// The only command a transfer may carry.
pub const OPEN_COMMAND: &str = "open";

/// Body of a transfer frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub command: String,
    #[serde(rename = "objData")]
    pub obj_data: ObjData,
}

/// A parsed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Probe,
    ProbeAck,
    Shutdown,
    /// A batch: parent ID -> artifact base names.
    Manifest(ObjData),
    Loaded,
    /// Any other text.
    Unknown(String),
}

impl Frame {
    /// Parse a payload.
    ///
    /// A payload that looks like JSON must decode to an `open` message;
    /// anything else is a protocol violation rather than [`Frame::Unknown`].
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(payload)
            .map_err(|_| SyncError::Protocol("frame is not UTF-8".into()))?;

        let frame = match text {
            PROBE => Frame::Probe,
            PROBE_ACK => Frame::ProbeAck,
            SHUTDOWN => Frame::Shutdown,
            LOADED => Frame::Loaded,
            _ if text.trim_start().starts_with('{') => {
                let message: WireMessage = serde_json::from_str(text)
                    .map_err(|e| SyncError::Protocol(format!("undecodable message: {}", e)))?;
                if message.command != OPEN_COMMAND {
                    return Err(SyncError::Protocol(format!(
                        "unsupported command {:?}",
                        message.command
                    )));
                }
                Frame::Manifest(message.obj_data)
            }
            _ => Frame::Unknown(text.to_owned()),
        };
        Ok(frame)
    }

    /// The payload bytes for this frame.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let bytes = match self {
            Frame::Probe => Bytes::from_static(PROBE.as_bytes()),
            Frame::ProbeAck => Bytes::from_static(PROBE_ACK.as_bytes()),
            Frame::Shutdown => Bytes::from_static(SHUTDOWN.as_bytes()),
            Frame::Loaded => Bytes::from_static(LOADED.as_bytes()),
            Frame::Manifest(data) => {
                let message = WireMessage {
                    command: OPEN_COMMAND.to_owned(),
                    obj_data: data.clone(),
                };
                serde_json::to_vec(&message)
                    .map(Bytes::from)
                    .map_err(|e| SyncError::Protocol(format!("cannot encode message: {}", e)))?
            }
            Frame::Unknown(text) => Bytes::from(text.clone().into_bytes()),
        };
        Ok(bytes)
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Probe => "probe",
            Frame::ProbeAck => "probe-ack",
            Frame::Shutdown => "shutdown",
            Frame::Manifest(_) => "manifest",
            Frame::Loaded => "loaded",
            Frame::Unknown(_) => "unknown",
        }
    }
}
