use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("the configured storage backend does not support {0}")]
    Unsupported(&'static str),

    #[error("store error: {0}")]
    Store(#[from] cq_store::StoreError),

    #[error("ledger error: {0}")]
    Ledger(#[from] cq_ledger::LedgerError),

    #[error("quiz error: {0}")]
    Quiz(#[from] cq_quiz::QuizError),

    #[error("cinema error: {0}")]
    Cinema(#[from] cq_cinema::CinemaError),

    #[error("invalid value: {0}")]
    Type(#[from] cq_types::TypeError),
}

pub type SdkResult<T> = Result<T, SdkError>;
