// src/repository/mod.rs

//! Storage seam for the submission engine.
//!
//! Handlers and services only see [`Repository`] and [`UnitOfWork`]; the
//! PostgreSQL and in-memory backends live behind them.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    attempt::{Attempt, NewAttempt},
    progress::{ProgressKey, ProgressRecord},
    quiz::{Quiz, QuizFilter, QuizSummary},
};

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

/// Storage failures, classified by how the caller should react.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Lock wait timed out or a concurrent writer won. Safe to retry.
    #[error("lock contention: {0}")]
    Contention(String),

    /// Storage could not be reached.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    /// Returns `true` if rerunning the whole unit of work may succeed.
    pub fn is_contention(&self) -> bool {
        matches!(self, StoreError::Contention(_))
    }
}

// Postgres SQLSTATEs that mean "someone else holds or just changed this row".
const LOCK_NOT_AVAILABLE: &str = "55P03";
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const UNIQUE_VIOLATION: &str = "23505";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some(LOCK_NOT_AVAILABLE | SERIALIZATION_FAILURE | DEADLOCK_DETECTED | UNIQUE_VIOLATION) => {
                    StoreError::Contention(db_err.message().to_string())
                }
                _ => StoreError::Database(err.to_string()),
            },
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            _ => StoreError::Database(err.to_string()),
        }
    }
}

/// Read access plus the entry point for atomic writes.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Loads a quiz with its ordered question set.
    async fn find_quiz(&self, quiz_id: i64) -> Result<Option<Quiz>, StoreError>;

    /// Quizzes matching `filter`, ordered by id.
    async fn list_quizzes(&self, filter: &QuizFilter) -> Result<Vec<QuizSummary>, StoreError>;

    /// Starts a unit of work. Dropping it without `commit` rolls it back.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;

    /// A user's attempts, newest first.
    async fn list_attempts(&self, user_id: i64) -> Result<Vec<Attempt>, StoreError>;

    async fn find_attempt(&self, attempt_id: i64) -> Result<Option<Attempt>, StoreError>;

    /// A user's per-quiz progress records, ordered by quiz id.
    async fn list_quiz_progress(&self, user_id: i64) -> Result<Vec<ProgressRecord>, StoreError>;

    /// Unlocked read of a single progress record.
    async fn find_progress(&self, key: &ProgressKey) -> Result<Option<ProgressRecord>, StoreError>;
}

/// An all-or-nothing batch of writes.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Reads the progress record for `key` and holds an exclusive lock on it
    /// until commit or rollback. Waits are bounded; a timeout is reported as
    /// [`StoreError::Contention`].
    async fn lock_progress(&mut self, key: &ProgressKey) -> Result<Option<ProgressRecord>, StoreError>;

    /// Appends an attempt row.
    async fn insert_attempt(&mut self, attempt: &NewAttempt) -> Result<Attempt, StoreError>;

    /// Writes a progress record. Its key must have been locked by this unit.
    async fn save_progress(&mut self, record: &ProgressRecord) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_is_unavailable() {
        let err = StoreError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(!err.is_contention());
    }

    #[test]
    fn test_row_not_found_is_database_error() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(_)));
    }
}
