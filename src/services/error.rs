// src/services/error.rs

use thiserror::Error;

use crate::repository::StoreError;

/// Referentially invalid or malformed submissions. Always a client fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("No answers submitted")]
    EmptySubmission,

    #[error("Invalid question ID: {0}")]
    UnknownQuestion(i64),

    #[error("time_taken must not be negative (got {0})")]
    NegativeTimeTaken(i64),

    #[error("time_taken must be at most {max} seconds (got {got})")]
    TimeTakenTooLarge { got: i64, max: i64 },
}

/// A quiz with no questions cannot be scored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Quiz {quiz_id} has no questions")]
pub struct EmptyQuizError {
    pub quiz_id: i64,
}

/// Everything `AttemptTransaction::submit` can fail with.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    EmptyQuiz(#[from] EmptyQuizError),

    #[error("Quiz {0} not found")]
    QuizNotFound(i64),

    /// Lock or transaction conflict that outlived the retry budget.
    #[error("Progress record is busy, please retry: {0}")]
    Contention(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Persistence failure: {0}")]
    Persistence(String),
}

impl SubmitError {
    /// Returns `true` if the caller may resubmit the same payload.
    /// Nothing was written when this is an error.
    pub fn is_retriable(&self) -> bool {
        matches!(self, SubmitError::Contention(_) | SubmitError::Unavailable(_))
    }
}

impl From<StoreError> for SubmitError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Contention(msg) => SubmitError::Contention(msg),
            StoreError::Unavailable(msg) => SubmitError::Unavailable(msg),
            StoreError::Database(msg) => SubmitError::Persistence(msg),
        }
    }
}
