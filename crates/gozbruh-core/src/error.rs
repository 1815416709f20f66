//! Error types for gozbruh core.

use thiserror::Error;

/// Errors raised while building or checking core values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid object name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("invalid manifest: {0}")]
    InvalidManifest(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
