//! Errors reported by the metadata store client.
//!
//! The store classifies its own failures; the registry engine never
//! reclassifies them, it only forwards them so the transport can pick a
//! status code.

use thiserror::Error;

/// Result type for metadata store calls
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failure reported by the metadata store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Request rejected by the store (bad filter, undeclared property, ...)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Referenced node or type does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Uniqueness constraint violated on write
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Anything else
    #[error("internal store error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an already exists error
    pub fn already_exists(msg: impl Into<String>) -> Self {
        Self::AlreadyExists(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
