// src/handlers/results.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::PathRejection},
    response::IntoResponse,
};

use crate::{error::AppError, repository::Repository, utils::jwt::Claims};

/// Lists the caller's attempts, newest first.
pub async fn list_results(
    State(repo): State<Arc<dyn Repository>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let attempts = repo.list_attempts(user_id).await?;
    Ok(Json(attempts))
}

/// Returns one of the caller's attempts.
/// Attempts belonging to other users are reported as missing.
pub async fn get_result(
    State(repo): State<Arc<dyn Repository>>,
    Extension(claims): Extension<Claims>,
    attempt_id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(attempt_id) = attempt_id?;
    let user_id = claims.user_id()?;

    let attempt = repo
        .find_attempt(attempt_id)
        .await?
        .filter(|a| a.user_id == user_id)
        .ok_or(AppError::NotFound("Result not found".to_string()))?;

    Ok(Json(attempt))
}
