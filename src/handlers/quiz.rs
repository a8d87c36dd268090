// src/handlers/quiz.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    response::IntoResponse,
};
use serde::Deserialize;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        attempt::SubmitAttemptRequest,
        quiz::{Category, Difficulty, PublicQuiz, QuizFilter},
    },
    repository::Repository,
    services::AttemptTransaction,
    utils::jwt::Claims,
};

/// Optional `?category=&difficulty=` filters for the quiz catalogue.
#[derive(Debug, Deserialize)]
pub struct QuizListParams {
    pub category: Option<String>,
    pub difficulty: Option<String>,
}

impl QuizListParams {
    fn into_filter(self) -> Result<QuizFilter, AppError> {
        Ok(QuizFilter {
            category: self.category.as_deref().map(parse_category).transpose()?,
            difficulty: self.difficulty.as_deref().map(parse_difficulty).transpose()?,
        })
    }
}

fn parse_category(raw: &str) -> Result<Category, AppError> {
    raw.parse().map_err(AppError::BadRequest)
}

fn parse_difficulty(raw: &str) -> Result<Difficulty, AppError> {
    raw.parse().map_err(AppError::BadRequest)
}

/// Lists quizzes, optionally narrowed by category and difficulty.
pub async fn list_quizzes(
    State(repo): State<Arc<dyn Repository>>,
    params: Result<Query<QuizListParams>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(params) = params?;
    let quizzes = repo.list_quizzes(&params.into_filter()?).await?;
    Ok(Json(quizzes))
}

/// Lists the quizzes of one category.
pub async fn list_quizzes_by_category(
    State(repo): State<Arc<dyn Repository>>,
    Path(category): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let filter = QuizFilter {
        category: Some(parse_category(&category)?),
        difficulty: None,
    };
    Ok(Json(repo.list_quizzes(&filter).await?))
}

/// Lists the quizzes of one difficulty level.
pub async fn list_quizzes_by_difficulty(
    State(repo): State<Arc<dyn Repository>>,
    Path(difficulty): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let filter = QuizFilter {
        category: None,
        difficulty: Some(parse_difficulty(&difficulty)?),
    };
    Ok(Json(repo.list_quizzes(&filter).await?))
}

/// Returns a quiz and its questions without the correct answers.
pub async fn get_quiz(
    State(repo): State<Arc<dyn Repository>>,
    quiz_id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(quiz_id) = quiz_id?;

    let quiz = repo
        .find_quiz(quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    Ok(Json(PublicQuiz::from(quiz)))
}

/// Submits the caller's answers for a quiz.
///
/// * Validates the payload shape (validator) and the caller id (token).
/// * Scores against the stored answer key.
/// * Records the attempt and updates quiz and category progress atomically.
pub async fn submit_attempt(
    State(submissions): State<AttemptTransaction>,
    Extension(claims): Extension<Claims>,
    quiz_id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<SubmitAttemptRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(quiz_id) = quiz_id?;
    let Json(req) = payload?;
    req.validate()?;

    let user_id = claims.user_id()?;

    let summary = submissions.submit(quiz_id, user_id, &req).await?;

    Ok(Json(summary))
}
