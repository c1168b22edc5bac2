//! Router assembly: HTTP endpoints, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - REST-ish API under `/api/v1/...`
/// - CORS (allow any origin/method/headers) – adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(http::http_health))
        // Write side: the practice event cascade + student bootstrap
        .route("/api/v1/practice", post(http::http_post_practice))
        .route("/api/v1/students/init", post(http::http_post_init))
        // Read side
        .route("/api/v1/level", get(http::http_get_level))
        .route("/api/v1/achievements", get(http::http_get_achievements))
        .route("/api/v1/challenges", get(http::http_get_challenges))
        .route("/api/v1/challenges/stats", get(http::http_get_challenge_stats))
        .route("/api/v1/suggestions", get(http::http_get_suggestions))
        .route("/api/v1/dashboard", get(http::http_get_dashboard))
        .route("/api/v1/leaderboard", get(http::http_get_leaderboard))
        // Tasks
        .route("/api/v1/tasks", get(http::http_get_tasks).post(http::http_post_task))
        .route("/api/v1/tasks/complete", post(http::http_post_task_complete))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}
