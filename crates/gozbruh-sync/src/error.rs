//! Error types for the sync module.

use thiserror::Error;

/// Errors that can occur on the wire.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Host name does not resolve. Not retried.
    #[error("cannot resolve host {host}: {reason}")]
    Address { host: String, reason: String },

    /// Port is not a valid integer. Not retried.
    #[error("invalid port in {0:?}")]
    Port(String),

    /// Refused, reset or broken connection.
    #[error("connection error: {0}")]
    Connection(String),

    /// No answer in time.
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),

    /// Malformed or unexpected frame.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Operation needs an open connection.
    #[error("not connected")]
    NotConnected,

    /// Another transfer holds the connection.
    #[error("transfer in progress")]
    TransferInProgress,

    /// Frame exceeds the configured maximum.
    #[error("frame exceeds {max} bytes")]
    FrameTooLarge { max: usize },

    /// Socket I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Whether the error leaves the connection unusable.
    pub fn invalidates_connection(&self) -> bool {
        !matches!(
            self,
            SyncError::TransferInProgress | SyncError::NotConnected
        )
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
