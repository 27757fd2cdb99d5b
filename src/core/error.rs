//! Error types and handling for the model registry
//!
//! The engine classifies exactly two kinds of failure itself (bad request and
//! not found). Everything else is forwarded from the metadata store with the
//! store's own classification so the transport can map it to a status code.

use crate::store::StoreError;
use thiserror::Error;

/// Main result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the model registry
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input, unmappable value, missing required reference
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing entity or parent, zero or ambiguous match
    #[error("not found: {0}")]
    NotFound(String),

    /// Lower-level error wrapped with additional context
    #[error("{context}: {source}")]
    Context {
        /// What was being done
        context: String,
        /// Original error, classification preserved
        #[source]
        source: Box<Error>,
    },

    /// Metadata store errors
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O errors from std
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Prometheus metrics errors
    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// Classification used by the transport to pick a status code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 400
    BadRequest,
    /// 404
    NotFound,
    /// 409
    Conflict,
    /// 500
    Internal,
}

impl Error {
    /// Create a bad request error
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Classification of this error, looking through context wrappers
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::BadRequest(_) => ErrorKind::BadRequest,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Context { source, .. } => source.kind(),
            Error::Store(StoreError::InvalidArgument(_)) => ErrorKind::BadRequest,
            Error::Store(StoreError::NotFound(_)) => ErrorKind::NotFound,
            Error::Store(StoreError::AlreadyExists(_)) => ErrorKind::Conflict,
            Error::Store(StoreError::Internal(_))
            | Error::Config(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::Metrics(_) => ErrorKind::Internal,
        }
    }
}

/// Attach context to a failing result without losing its classification
pub trait ResultExt<T> {
    /// Wrap the error with a lazily built context message
    fn context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| Error::Context {
            context: f().into(),
            source: Box::new(e.into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_keep_their_classification() {
        assert_eq!(Error::from(StoreError::already_exists("x")).kind(), ErrorKind::Conflict);
        assert_eq!(Error::from(StoreError::invalid_argument("x")).kind(), ErrorKind::BadRequest);
        assert_eq!(Error::from(StoreError::not_found("x")).kind(), ErrorKind::NotFound);
        assert_eq!(Error::from(StoreError::internal("x")).kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_context_preserves_kind() {
        let res: std::result::Result<(), Error> = Err(Error::not_found("model 7"));
        let err = res.context(|| "fetching parent").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "fetching parent: not found: model 7");

        let nested: std::result::Result<(), Error> = Err(err);
        assert_eq!(nested.context(|| "outer").unwrap_err().kind(), ErrorKind::NotFound);
    }
}
