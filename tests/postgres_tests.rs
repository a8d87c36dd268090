// tests/postgres_tests.rs
//
// Runs against a real PostgreSQL when DATABASE_URL is set; otherwise each
// test returns early.

use std::{sync::Arc, time::Duration};

use quiz_progress::{
    models::{
        attempt::{AnswerSubmission, SubmitAttemptRequest},
        progress::ProgressKey,
        quiz::{Category, Difficulty, QuizFilter},
    },
    repository::{PgRepository, Repository},
    services::{AttemptTransaction, RetryPolicy, SubmitError},
};
use sqlx::{PgPool, postgres::PgPoolOptions};

async fn connect() -> Option<PgPool> {
    let database_url = std::env::var("DATABASE_URL").ok()?;

    let pool = PgPoolOptions::new()
        .max_connections(8)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    Some(pool)
}

/// Inserts a four-question quiz ("A".."D", pass at 70) and returns its id.
async fn seed_quiz(pool: &PgPool) -> i64 {
    let quiz_id: i64 = sqlx::query_scalar(
        "INSERT INTO quizzes (title, category, passing_score) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind("Letters")
    .bind(Category::Science.as_str())
    .bind(70.0_f64)
    .fetch_one(pool)
    .await
    .unwrap();

    for (position, answer) in ["A", "B", "C", "D"].iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO questions (quiz_id, position, content, options, answer)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(quiz_id)
        .bind(position as i32)
        .bind(format!("Question {}", position + 1))
        .bind(serde_json::json!(["A", "B", "C", "D"]))
        .bind(*answer)
        .execute(pool)
        .await
        .unwrap();
    }

    quiz_id
}

fn engine(pool: PgPool) -> (Arc<PgRepository>, AttemptTransaction) {
    let repo = Arc::new(PgRepository::new(pool, Duration::from_secs(2)));
    let tx = AttemptTransaction::new(
        repo.clone(),
        RetryPolicy {
            max_retries: 5,
            backoff: Duration::from_millis(10),
        },
    );
    (repo, tx)
}

async fn answers_for(repo: &PgRepository, quiz_id: i64, given: &[&str]) -> SubmitAttemptRequest {
    let quiz = repo.find_quiz(quiz_id).await.unwrap().unwrap();
    SubmitAttemptRequest {
        answers: quiz
            .questions
            .iter()
            .zip(given)
            .map(|(q, a)| AnswerSubmission {
                question_id: q.id,
                answer: a.to_string(),
            })
            .collect(),
        time_taken: 30,
    }
}

#[tokio::test]
async fn pg_submit_records_attempt_and_progress() {
    let Some(pool) = connect().await else {
        return;
    };
    let quiz_id = seed_quiz(&pool).await;
    let user_id = quiz_id * 1000 + 1;
    let (repo, tx) = engine(pool);

    let req = answers_for(&repo, quiz_id, &["A", "B", "X", "D"]).await;
    let summary = tx.submit(quiz_id, user_id, &req).await.unwrap();

    assert_eq!(summary.score, 75.0);
    assert_eq!(summary.correct_answers, 3);
    assert!(summary.is_passed);

    let attempts = repo.list_attempts(user_id).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(repo.find_attempt(attempts[0].id).await.unwrap(), Some(attempts[0].clone()));

    let progress = repo.list_quiz_progress(user_id).await.unwrap();
    assert_eq!(progress.len(), 1);
    assert_eq!(progress[0].key, ProgressKey::quiz(user_id, quiz_id));
    assert_eq!(progress[0].mastery_level, 3);

    let category = repo
        .find_progress(&ProgressKey::category(user_id, Category::Science))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(category.total_attempts, 1);
}

#[tokio::test]
async fn pg_unknown_question_writes_nothing() {
    let Some(pool) = connect().await else {
        return;
    };
    let quiz_id = seed_quiz(&pool).await;
    let user_id = quiz_id * 1000 + 2;
    let (repo, tx) = engine(pool);

    let req = SubmitAttemptRequest {
        answers: vec![AnswerSubmission {
            question_id: -1,
            answer: "A".to_string(),
        }],
        time_taken: 5,
    };
    let err = tx.submit(quiz_id, user_id, &req).await.unwrap_err();

    assert!(matches!(err, SubmitError::Validation(_)));
    assert!(repo.list_attempts(user_id).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pg_concurrent_submissions_do_not_lose_updates() {
    let Some(pool) = connect().await else {
        return;
    };
    let quiz_id = seed_quiz(&pool).await;
    let user_id = quiz_id * 1000 + 3;
    let (repo, tx) = engine(pool);

    let patterns: [&[&str]; 4] = [
        &["A", "B", "C", "D"],
        &["A", "X", "X", "X"],
        &["X", "X", "X", "X"],
        &["A", "B", "X", "X"],
    ];

    let mut handles = Vec::new();
    for i in 0..16 {
        let req = answers_for(&repo, quiz_id, patterns[i % patterns.len()]).await;
        let tx = tx.clone();
        handles.push(tokio::spawn(async move { tx.submit(quiz_id, user_id, &req).await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let attempts = repo.list_attempts(user_id).await.unwrap();
    let mean = attempts.iter().map(|a| a.score).sum::<f64>() / attempts.len() as f64;

    let progress = repo
        .find_progress(&ProgressKey::quiz(user_id, quiz_id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(attempts.len(), 16);
    assert_eq!(progress.total_attempts, 16);
    assert!((progress.average_score - mean).abs() < 1e-9);
    assert_eq!(progress.best_score, 100.0);
}

#[tokio::test]
async fn pg_list_quizzes_filters_and_counts_questions() {
    let Some(pool) = connect().await else {
        return;
    };
    let quiz_id = seed_quiz(&pool).await;
    let (repo, _) = engine(pool);

    let science_medium = QuizFilter {
        category: Some(Category::Science),
        difficulty: Some(Difficulty::Medium),
    };
    let listed = repo.list_quizzes(&science_medium).await.unwrap();
    let seeded = listed.iter().find(|q| q.id == quiz_id).unwrap();
    assert_eq!(seeded.question_count, 4);
    assert_eq!(seeded.difficulty, Difficulty::Medium);

    let hard = QuizFilter {
        category: None,
        difficulty: Some(Difficulty::Hard),
    };
    let listed = repo.list_quizzes(&hard).await.unwrap();
    assert!(listed.iter().all(|q| q.id != quiz_id));
}
