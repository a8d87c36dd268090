// src/handlers/progress.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::{progress::ProgressKey, quiz::Category},
    repository::Repository,
    utils::jwt::Claims,
};

/// Lists the caller's per-quiz progress.
pub async fn list_progress(
    State(repo): State<Arc<dyn Repository>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let records = repo.list_quiz_progress(user_id).await?;
    Ok(Json(records))
}

/// Returns the caller's progress across all quizzes of a category.
pub async fn get_category_progress(
    State(repo): State<Arc<dyn Repository>>,
    Extension(claims): Extension<Claims>,
    Path(category): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let category: Category = category.parse().map_err(AppError::BadRequest)?;

    let record = repo
        .find_progress(&ProgressKey::category(user_id, category))
        .await?
        .ok_or(AppError::NotFound("No progress for this category".to_string()))?;

    Ok(Json(record))
}
