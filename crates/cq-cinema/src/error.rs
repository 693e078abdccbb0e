use cq_store::StoreError;

/// Errors produced by the cinema catalog.
#[derive(Debug, thiserror::Error)]
pub enum CinemaError {
    #[error("malformed cinema catalog: {0}")]
    Malformed(String),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl CinemaError {
    /// Whether trying again could give a different answer.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CinemaError::Storage(StoreError::Unavailable(_) | StoreError::Timeout(_))
        )
    }
}

/// Result alias for cinema operations.
pub type CinemaResult<T> = Result<T, CinemaError>;
