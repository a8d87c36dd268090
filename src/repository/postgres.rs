// src/repository/postgres.rs

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction, types::Json};

use crate::{
    models::{
        attempt::{Attempt, NewAttempt},
        progress::{ProgressKey, ProgressRecord, ProgressScope},
        quiz::{Category, Difficulty, Question, Quiz, QuizFilter, QuizSummary},
    },
    repository::{Repository, StoreError, UnitOfWork},
};

const ATTEMPT_COLUMNS: &str = "id, quiz_id, user_id, score, total_questions, correct_answers, \
     time_taken, is_passed, passing_score, created_at";

const PROGRESS_COLUMNS: &str = "total_attempts, best_score, average_score, total_time_spent, \
     last_attempted_at, mastery_level";

/// Helper struct for fetching a quiz header.
#[derive(FromRow)]
struct QuizRow {
    id: i64,
    title: String,
    category: String,
    difficulty: String,
    passing_score: f64,
}

impl QuizRow {
    fn labels(&self) -> Result<(Category, Difficulty), StoreError> {
        let category = self.category.parse().map_err(StoreError::Database)?;
        let difficulty = self.difficulty.parse().map_err(StoreError::Database)?;
        Ok((category, difficulty))
    }
}

#[derive(FromRow)]
struct QuizSummaryRow {
    #[sqlx(flatten)]
    quiz: QuizRow,
    question_count: i64,
}

#[derive(FromRow)]
struct QuestionRow {
    id: i64,
    content: String,
    options: Json<Vec<String>>,
    answer: String,
}

/// Progress columns shared by `quiz_progress` and `category_progress`.
#[derive(FromRow)]
struct ProgressStatsRow {
    total_attempts: i64,
    best_score: f64,
    average_score: f64,
    total_time_spent: i64,
    last_attempted_at: DateTime<Utc>,
    mastery_level: i16,
}

impl ProgressStatsRow {
    fn into_record(self, key: ProgressKey) -> Result<ProgressRecord, StoreError> {
        let mastery_level = u8::try_from(self.mastery_level).map_err(|_| {
            StoreError::Database(format!("mastery level {} out of range", self.mastery_level))
        })?;

        Ok(ProgressRecord {
            key,
            total_attempts: self.total_attempts,
            best_score: self.best_score,
            average_score: self.average_score,
            total_time_spent: self.total_time_spent,
            last_attempted_at: self.last_attempted_at,
            mastery_level,
        })
    }
}

#[derive(FromRow)]
struct QuizProgressRow {
    user_id: i64,
    quiz_id: i64,
    #[sqlx(flatten)]
    stats: ProgressStatsRow,
}

/// Table and key column holding records for a scope.
fn progress_table(scope: &ProgressScope) -> (&'static str, &'static str) {
    match scope {
        ProgressScope::Quiz { .. } => ("quiz_progress", "quiz_id"),
        ProgressScope::Category { .. } => ("category_progress", "category"),
    }
}

/// Binds `user_id` and the scope value as `$1` and `$2`.
fn bind_key<'q, O>(
    query: sqlx::query::QueryAs<'q, Postgres, O, sqlx::postgres::PgArguments>,
    key: &ProgressKey,
) -> sqlx::query::QueryAs<'q, Postgres, O, sqlx::postgres::PgArguments> {
    let query = query.bind(key.user_id);
    match key.scope {
        ProgressScope::Quiz { quiz_id } => query.bind(quiz_id),
        ProgressScope::Category { category } => query.bind(category.as_str()),
    }
}

/// PostgreSQL-backed repository.
///
/// Progress rows are serialized with `SELECT ... FOR UPDATE`; every unit of
/// work sets `lock_timeout` so a blocked writer fails instead of waiting forever.
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PgRepository {
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn find_quiz(&self, quiz_id: i64) -> Result<Option<Quiz>, StoreError> {
        let quiz = sqlx::query_as::<_, QuizRow>(
            "SELECT id, title, category, difficulty, passing_score FROM quizzes WHERE id = $1",
        )
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(quiz) = quiz else {
            return Ok(None);
        };

        let (category, difficulty) = quiz.labels()?;

        let questions = sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT id, content, options, answer
            FROM questions
            WHERE quiz_id = $1
            ORDER BY position, id
            "#,
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(Quiz {
            id: quiz.id,
            title: quiz.title,
            category,
            difficulty,
            passing_score: quiz.passing_score,
            questions: questions
                .into_iter()
                .map(|q| Question {
                    id: q.id,
                    content: q.content,
                    options: q.options.0,
                    answer: q.answer,
                })
                .collect(),
        }))
    }

    async fn list_quizzes(&self, filter: &QuizFilter) -> Result<Vec<QuizSummary>, StoreError> {
        let rows = sqlx::query_as::<_, QuizSummaryRow>(
            r#"
            SELECT q.id, q.title, q.category, q.difficulty, q.passing_score,
                   COUNT(qs.id) AS question_count
            FROM quizzes q
            LEFT JOIN questions qs ON qs.quiz_id = q.id
            WHERE ($1::TEXT IS NULL OR q.category = $1)
              AND ($2::TEXT IS NULL OR q.difficulty = $2)
            GROUP BY q.id
            ORDER BY q.id
            "#,
        )
        .bind(filter.category.map(|c| c.as_str()))
        .bind(filter.difficulty.map(|d| d.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<QuizSummary, StoreError> {
                let (category, difficulty) = row.quiz.labels()?;
                Ok(QuizSummary {
                    id: row.quiz.id,
                    title: row.quiz.title,
                    category,
                    difficulty,
                    passing_score: row.quiz.passing_score,
                    question_count: row.question_count,
                })
            })
            .collect()
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let mut tx = self.pool.begin().await?;

        // SET does not take bind parameters; the value is an integer we own.
        sqlx::query(&format!(
            "SET LOCAL lock_timeout = '{}ms'",
            self.lock_timeout.as_millis()
        ))
        .execute(&mut *tx)
        .await?;

        Ok(Box::new(PgUnitOfWork {
            tx,
            locked: HashMap::new(),
        }))
    }

    async fn list_attempts(&self, user_id: i64) -> Result<Vec<Attempt>, StoreError> {
        let sql = format!(
            "SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        );
        let attempts = sqlx::query_as::<_, Attempt>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(attempts)
    }

    async fn find_attempt(&self, attempt_id: i64) -> Result<Option<Attempt>, StoreError> {
        let sql = format!("SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE id = $1");
        let attempt = sqlx::query_as::<_, Attempt>(&sql)
            .bind(attempt_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(attempt)
    }

    async fn list_quiz_progress(&self, user_id: i64) -> Result<Vec<ProgressRecord>, StoreError> {
        let sql = format!(
            "SELECT user_id, quiz_id, {PROGRESS_COLUMNS} FROM quiz_progress WHERE user_id = $1 ORDER BY quiz_id"
        );
        let rows = sqlx::query_as::<_, QuizProgressRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| row.stats.into_record(ProgressKey::quiz(row.user_id, row.quiz_id)))
            .collect()
    }

    async fn find_progress(&self, key: &ProgressKey) -> Result<Option<ProgressRecord>, StoreError> {
        let (table, column) = progress_table(&key.scope);
        let sql = format!("SELECT {PROGRESS_COLUMNS} FROM {table} WHERE user_id = $1 AND {column} = $2");

        bind_key(sqlx::query_as::<_, ProgressStatsRow>(&sql), key)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| row.into_record(*key))
            .transpose()
    }
}

/// A database transaction. Rolled back by sqlx when dropped uncommitted.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,

    /// Keys locked by this unit, and whether a row existed at lock time.
    locked: HashMap<ProgressKey, bool>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn lock_progress(&mut self, key: &ProgressKey) -> Result<Option<ProgressRecord>, StoreError> {
        let (table, column) = progress_table(&key.scope);
        let sql = format!(
            "SELECT {PROGRESS_COLUMNS} FROM {table} WHERE user_id = $1 AND {column} = $2 FOR UPDATE"
        );

        let record = bind_key(sqlx::query_as::<_, ProgressStatsRow>(&sql), key)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(|row| row.into_record(*key))
            .transpose()?;

        self.locked.insert(*key, record.is_some());
        Ok(record)
    }

    async fn insert_attempt(&mut self, attempt: &NewAttempt) -> Result<Attempt, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO attempts
                (quiz_id, user_id, score, total_questions, correct_answers,
                 time_taken, is_passed, passing_score, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {ATTEMPT_COLUMNS}
            "#
        );

        let inserted = sqlx::query_as::<_, Attempt>(&sql)
            .bind(attempt.quiz_id)
            .bind(attempt.user_id)
            .bind(attempt.score)
            .bind(attempt.total_questions)
            .bind(attempt.correct_answers)
            .bind(attempt.time_taken)
            .bind(attempt.is_passed)
            .bind(attempt.passing_score)
            .bind(attempt.created_at)
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(inserted)
    }

    async fn save_progress(&mut self, record: &ProgressRecord) -> Result<(), StoreError> {
        let existed = *self.locked.get(&record.key).ok_or_else(|| {
            StoreError::Database("progress record must be locked before it is written".to_string())
        })?;

        let (table, column) = progress_table(&record.key.scope);

        // A missing row cannot be locked, so a concurrent first attempt shows
        // up here as a unique violation and is retried as contention.
        let sql = if existed {
            format!(
                r#"
                UPDATE {table} SET
                    total_attempts = $3, best_score = $4, average_score = $5,
                    total_time_spent = $6, last_attempted_at = $7, mastery_level = $8
                WHERE user_id = $1 AND {column} = $2
                "#
            )
        } else {
            format!(
                r#"
                INSERT INTO {table} (user_id, {column}, {PROGRESS_COLUMNS})
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#
            )
        };

        let query = sqlx::query(&sql).bind(record.key.user_id);
        let query = match record.key.scope {
            ProgressScope::Quiz { quiz_id } => query.bind(quiz_id),
            ProgressScope::Category { category } => query.bind(category.as_str()),
        };

        query
            .bind(record.total_attempts)
            .bind(record.best_score)
            .bind(record.average_score)
            .bind(record.total_time_spent)
            .bind(record.last_attempted_at)
            .bind(i16::from(record.mastery_level))
            .execute(&mut *self.tx)
            .await?;

        self.locked.insert(record.key, true);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}
