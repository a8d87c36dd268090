// src/services/submission.rs

use std::{sync::Arc, time::Duration};

use chrono::Utc;

use crate::{
    models::{
        attempt::{Attempt, AttemptSummary, MAX_TIME_TAKEN_SECS, NewAttempt, SubmitAttemptRequest},
        progress::ProgressKey,
        quiz::Quiz,
    },
    repository::{Repository, StoreError},
    services::{
        error::{EmptyQuizError, SubmitError, ValidationError},
        progress,
        scoring::{self, ScoreResult},
        validation,
    },
};

/// How often a unit of work is rerun after losing a lock race.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,

    /// Delay before the first retry; doubled for each further one.
    pub backoff: Duration,
}

impl RetryPolicy {
    fn delay(&self, retry: u32) -> Duration {
        self.backoff.saturating_mul(2u32.saturating_pow(retry))
    }
}

/// Scores a submission and records it.
///
/// Validation and scoring run before anything is written. The attempt row
/// and both progress rows it feeds (per quiz and per category) are written
/// in a single unit of work, so either all three become visible or none do.
#[derive(Clone)]
pub struct AttemptTransaction {
    repo: Arc<dyn Repository>,
    retry: RetryPolicy,
}

impl AttemptTransaction {
    pub fn new(repo: Arc<dyn Repository>, retry: RetryPolicy) -> Self {
        Self { repo, retry }
    }

    pub async fn submit(
        &self,
        quiz_id: i64,
        user_id: i64,
        submission: &SubmitAttemptRequest,
    ) -> Result<AttemptSummary, SubmitError> {
        let quiz = self
            .repo
            .find_quiz(quiz_id)
            .await?
            .ok_or(SubmitError::QuizNotFound(quiz_id))?;

        if quiz.questions.is_empty() {
            return Err(EmptyQuizError { quiz_id }.into());
        }

        if submission.time_taken < 0 {
            return Err(ValidationError::NegativeTimeTaken(submission.time_taken).into());
        }
        if submission.time_taken > MAX_TIME_TAKEN_SECS {
            return Err(ValidationError::TimeTakenTooLarge {
                got: submission.time_taken,
                max: MAX_TIME_TAKEN_SECS,
            }
            .into());
        }

        let accepted = validation::validate(&quiz, &submission.answers)?;
        let result = scoring::score(&quiz, &accepted)?;

        let mut retry = 0;
        let attempt = loop {
            match self.record(&quiz, user_id, &result, submission.time_taken).await {
                Ok(attempt) => break attempt,
                Err(e) if e.is_contention() && retry < self.retry.max_retries => {
                    let delay = self.retry.delay(retry);
                    retry += 1;
                    tracing::warn!(
                        quiz_id,
                        user_id,
                        retry,
                        "Progress update contended ({}), retrying in {:?}",
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!(quiz_id, user_id, "Failed to record attempt: {}", e);
                    return Err(e.into());
                }
            }
        };

        tracing::info!(
            attempt_id = attempt.id,
            quiz_id,
            user_id,
            score = attempt.score,
            passed = attempt.is_passed,
            "Attempt recorded"
        );

        Ok(AttemptSummary::from(&attempt))
    }

    /// One all-or-nothing write of the attempt and its progress updates.
    async fn record(
        &self,
        quiz: &Quiz,
        user_id: i64,
        result: &ScoreResult,
        time_taken: i64,
    ) -> Result<Attempt, StoreError> {
        let now = Utc::now();
        let mut unit = self.repo.begin().await?;

        // Fixed lock order: quiz row, then category row.
        let keys = [
            ProgressKey::quiz(user_id, quiz.id),
            ProgressKey::category(user_id, quiz.category),
        ];
        let mut current = Vec::with_capacity(keys.len());
        for key in &keys {
            current.push(unit.lock_progress(key).await?);
        }

        let attempt = unit
            .insert_attempt(&NewAttempt {
                quiz_id: quiz.id,
                user_id,
                score: result.percentage,
                total_questions: result.total_questions as i32,
                correct_answers: result.correct_count as i32,
                time_taken,
                is_passed: result.passed,
                passing_score: quiz.passing_score,
                created_at: now,
            })
            .await?;

        for (key, existing) in keys.iter().zip(&current) {
            let updated = progress::aggregate(existing.as_ref(), key, result.percentage, time_taken, now);
            unit.save_progress(&updated).await?;
        }

        unit.commit().await?;
        Ok(attempt)
    }
}
