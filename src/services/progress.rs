// src/services/progress.rs

use chrono::{DateTime, Utc};

use crate::models::progress::{ProgressKey, ProgressRecord};

/// Minimum average score for each mastery level, highest first.
pub const MASTERY_THRESHOLDS: [(f64, u8); 4] = [(90.0, 5), (80.0, 4), (70.0, 3), (60.0, 2)];

/// Level for any score below the lowest threshold.
pub const BASE_MASTERY_LEVEL: u8 = 1;

/// Maps a 0-100 score to a mastery level (1-5).
pub fn classify(score: f64) -> u8 {
    MASTERY_THRESHOLDS
        .iter()
        .find(|(min, _)| score >= *min)
        .map(|(_, level)| *level)
        .unwrap_or(BASE_MASTERY_LEVEL)
}

/// Folds one new attempt into the running progress for `key`.
///
/// The average is updated incrementally, which reproduces the mean of every
/// recorded score as long as `existing` was read under the key's lock.
/// Mastery is always classified from the updated average. Cumulative time
/// saturates at `i64::MAX` rather than wrapping.
pub fn aggregate(
    existing: Option<&ProgressRecord>,
    key: &ProgressKey,
    score: f64,
    time_taken: i64,
    now: DateTime<Utc>,
) -> ProgressRecord {
    let Some(existing) = existing else {
        return ProgressRecord {
            key: *key,
            total_attempts: 1,
            best_score: score,
            average_score: score,
            total_time_spent: time_taken,
            last_attempted_at: now,
            mastery_level: classify(score),
        };
    };

    let total_attempts = existing.total_attempts + 1;
    let average_score =
        (existing.average_score * existing.total_attempts as f64 + score) / total_attempts as f64;

    ProgressRecord {
        key: *key,
        total_attempts,
        best_score: existing.best_score.max(score),
        average_score,
        total_time_spent: existing.total_time_spent.saturating_add(time_taken),
        last_attempted_at: now,
        mastery_level: classify(average_score),
    }
}
