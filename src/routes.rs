// src/routes.rs

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::{
    handlers::{health, progress, quiz, results},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Every `/api` route requires a bearer token; the caller id comes from it.
/// * `/health` is public.
/// * Applies global middleware (Trace).
/// * Injects global state (repository, submission engine, config).
pub fn create_router(state: AppState) -> Router {
    let quiz_routes = Router::new()
        .route("/", get(quiz::list_quizzes))
        .route("/category/{category}", get(quiz::list_quizzes_by_category))
        .route("/difficulty/{difficulty}", get(quiz::list_quizzes_by_difficulty))
        .route("/{id}", get(quiz::get_quiz))
        .route("/{id}/submit", post(quiz::submit_attempt));

    let result_routes = Router::new()
        .route("/", get(results::list_results))
        .route("/{id}", get(results::get_result));

    let progress_routes = Router::new()
        .route("/", get(progress::list_progress))
        .route("/category/{category}", get(progress::get_category_progress));

    // route_layer keeps unknown paths as 404 instead of 401
    let api_routes = Router::new()
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/results", result_routes)
        .nest("/api/progress", progress_routes)
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(health::health))
        .merge(api_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::{config::Config, repository::MemoryRepository};

    fn app() -> Router {
        let config = Config {
            database_url: String::new(),
            jwt_secret: "routes_test_secret".to_string(),
            rust_log: "error".to_string(),
            bind_addr: ([127, 0, 0, 1], 0).into(),
            lock_timeout_ms: 100,
            submit_max_retries: 0,
            submit_retry_backoff_ms: 1,
        };
        let repo = MemoryRepository::new(Duration::from_millis(100));
        create_router(AppState::new(Arc::new(repo), config))
    }

    #[tokio::test]
    async fn test_protected_route_requires_token() {
        let response = app()
            .oneshot(Request::get("/api/progress").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let response = app()
            .oneshot(Request::get("/nowhere").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
