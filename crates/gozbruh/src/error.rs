//! Error types for the bridge.

use gozbruh_core::CoreError;
use gozbruh_host::HostError;
use gozbruh_sync::SyncError;
use thiserror::Error;

/// Errors that can occur during a transfer.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Invalid name or manifest.
    #[error("invalid data: {0}")]
    Core(#[from] CoreError),

    /// Host operation failed.
    #[error("host error: {0}")]
    Host(#[from] HostError),

    /// Network or protocol failure.
    #[error("{0}")]
    Sync(#[from] SyncError),

    /// Nothing eligible to send.
    #[error("nothing to send: {0}")]
    Selection(String),

    /// An artifact named in a manifest is not in the shared directory.
    #[error("missing artifact: {0}")]
    MissingArtifact(String),

    /// Bad configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
