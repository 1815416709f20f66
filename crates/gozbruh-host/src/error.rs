//! Error types for host operations.

use gozbruh_core::CoreError;
use thiserror::Error;

/// Errors reported by a host integration.
#[derive(Debug, Error)]
pub enum HostError {
    /// No object with this name exists in the host.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// An object with this name already exists.
    #[error("object already exists: {0}")]
    ObjectExists(String),

    /// The host could not export an object.
    #[error("export of {object} failed: {reason}")]
    ExportFailed { object: String, reason: String },

    /// The host could not import a file.
    #[error("import of {path} failed: {reason}")]
    ImportFailed { path: String, reason: String },

    /// The host has no way to perform this operation.
    #[error("operation not supported by this host: {0}")]
    Unsupported(&'static str),

    /// A name coming out of the host is not usable.
    #[error("invalid name: {0}")]
    InvalidName(#[from] CoreError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for host operations.
pub type Result<T> = std::result::Result<T, HostError>;
