// src/models/progress.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::quiz::Category;

/// What a progress record aggregates over: one quiz, or every quiz in a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum ProgressScope {
    Quiz { quiz_id: i64 },
    Category { category: Category },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProgressKey {
    pub user_id: i64,
    #[serde(flatten)]
    pub scope: ProgressScope,
}

impl ProgressKey {
    pub fn quiz(user_id: i64, quiz_id: i64) -> Self {
        Self {
            user_id,
            scope: ProgressScope::Quiz { quiz_id },
        }
    }

    pub fn category(user_id: i64, category: Category) -> Self {
        Self {
            user_id,
            scope: ProgressScope::Category { category },
        }
    }
}

/// Running performance summary for a user against a quiz or a category.
///
/// `average_score` is the mean of every score recorded under `key` and
/// `total_attempts` the number of attempts recorded under it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    #[serde(flatten)]
    pub key: ProgressKey,
    pub total_attempts: i64,
    pub best_score: f64,
    pub average_score: f64,

    /// Cumulative seconds.
    pub total_time_spent: i64,
    pub last_attempted_at: DateTime<Utc>,

    /// 1 (novice) to 5 (mastered).
    pub mastery_level: u8,
}
