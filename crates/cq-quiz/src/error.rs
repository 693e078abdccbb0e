use cq_store::StoreError;

/// Errors produced by the quiz crate.
#[derive(Debug, thiserror::Error)]
pub enum QuizError {
    #[error("invalid question {text:?}: {reason}")]
    InvalidQuestion { text: String, reason: String },

    #[error("malformed question pool: {0}")]
    MalformedPool(String),

    #[error("question {index} out of range (session has {len})")]
    QuestionOutOfRange { index: usize, len: usize },

    #[error("question {0} was already answered")]
    AlreadyAnswered(usize),

    #[error("choice {choice} out of range for question {index}")]
    InvalidChoice { index: usize, choice: usize },

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl QuizError {
    /// Whether trying again could give a different answer.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            QuizError::Storage(StoreError::Unavailable(_) | StoreError::Timeout(_))
        )
    }
}

/// Result alias for quiz operations.
pub type QuizResult<T> = Result<T, QuizError>;
