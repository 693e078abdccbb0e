use std::time::Duration;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The bucket does not exist.
    #[error("bucket not found: {0}")]
    BucketNotFound(String),

    /// The credentials were rejected (HTTP 401/403).
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The backend could not be reached or answered with a server error.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The request did not complete in time.
    #[error("store request timed out after {0:?}")]
    Timeout(Duration),

    /// The key cannot be used as an object name.
    #[error("invalid object key {0:?}")]
    InvalidKey(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
