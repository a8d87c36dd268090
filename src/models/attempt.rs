// src/models/attempt.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Upper bound on `time_taken` for one attempt (24 hours, in seconds).
/// Keeps cumulative time far away from `i64` overflow.
pub const MAX_TIME_TAKEN_SECS: i64 = 86_400;

/// Represents the 'attempts' table in the database.
/// One immutable row per successful submission.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    pub quiz_id: i64,
    pub user_id: i64,

    /// Percentage score (0-100).
    pub score: f64,
    pub total_questions: i32,
    pub correct_answers: i32,

    /// Seconds spent on the attempt.
    pub time_taken: i64,
    pub is_passed: bool,

    /// Passing threshold at submission time. Not a live reference to the quiz.
    pub passing_score: f64,
    pub created_at: DateTime<Utc>,
}

/// An attempt that has not been assigned an id yet.
#[derive(Debug, Clone)]
pub struct NewAttempt {
    pub quiz_id: i64,
    pub user_id: i64,
    pub score: f64,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub time_taken: i64,
    pub is_passed: bool,
    pub passing_score: f64,
    pub created_at: DateTime<Utc>,
}

impl NewAttempt {
    pub fn with_id(self, id: i64) -> Attempt {
        Attempt {
            id,
            quiz_id: self.quiz_id,
            user_id: self.user_id,
            score: self.score,
            total_questions: self.total_questions,
            correct_answers: self.correct_answers,
            time_taken: self.time_taken,
            is_passed: self.is_passed,
            passing_score: self.passing_score,
            created_at: self.created_at,
        }
    }
}

/// A single answered question.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Validate)]
pub struct AnswerSubmission {
    pub question_id: i64,

    #[validate(length(max = 1000))]
    pub answer: String,
}

/// DTO for submitting a quiz attempt.
/// Quiz id comes from the path, the caller from the token.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct SubmitAttemptRequest {
    #[validate(nested)]
    pub answers: Vec<AnswerSubmission>,

    // Keep in sync with MAX_TIME_TAKEN_SECS.
    #[validate(range(min = 0, max = 86_400))]
    pub time_taken: i64,
}

/// Result summary returned to the caller after a successful submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptSummary {
    pub score: f64,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub time_taken: i64,
    pub is_passed: bool,
    pub passing_score: f64,
}

impl From<&Attempt> for AttemptSummary {
    fn from(attempt: &Attempt) -> Self {
        Self {
            score: attempt.score,
            total_questions: attempt.total_questions,
            correct_answers: attempt.correct_answers,
            time_taken: attempt.time_taken,
            is_passed: attempt.is_passed,
            passing_score: attempt.passing_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_request_rejects_negative_time() {
        let req = SubmitAttemptRequest {
            answers: vec![AnswerSubmission {
                question_id: 1,
                answer: "A".to_string(),
            }],
            time_taken: -1,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_submit_request_bounds_time_taken() {
        let mut req = SubmitAttemptRequest {
            answers: vec![AnswerSubmission {
                question_id: 1,
                answer: "A".to_string(),
            }],
            time_taken: MAX_TIME_TAKEN_SECS,
        };
        assert!(req.validate().is_ok());

        req.time_taken = MAX_TIME_TAKEN_SECS + 1;
        assert!(req.validate().is_err());

        req.time_taken = i64::MAX;
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_submit_request_rejects_oversized_answer() {
        let req = SubmitAttemptRequest {
            answers: vec![AnswerSubmission {
                question_id: 1,
                answer: "x".repeat(1001),
            }],
            time_taken: 30,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_submit_request_parses_wire_format() {
        let req: SubmitAttemptRequest = serde_json::from_value(serde_json::json!({
            "answers": [{ "question_id": 7, "answer": "B" }],
            "time_taken": 42
        }))
        .unwrap();

        assert!(req.validate().is_ok());
        assert_eq!(req.answers[0].question_id, 7);
        assert_eq!(req.time_taken, 42);
    }
}
