// src/services/mod.rs

pub mod error;
pub mod progress;
pub mod scoring;
pub mod submission;
pub mod validation;

pub use error::{EmptyQuizError, SubmitError, ValidationError};
pub use submission::{AttemptTransaction, RetryPolicy};
