//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented; validation failures map to 400, a missing
//! level state renders as an "uninitialized" envelope rather than an error.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::{info, instrument};

use crate::error::GamifyError;
use crate::logic;
use crate::protocol::*;
use crate::state::AppState;

fn error_response(e: GamifyError) -> (StatusCode, Json<ErrorOut>) {
    let status = match e {
        GamifyError::Validation(_) => StatusCode::BAD_REQUEST,
        // NotInitialized is handled at the endpoints that can see it;
        // anything reaching here is unexpected.
        GamifyError::NotInitialized | GamifyError::Computation(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(ErrorOut { message: e.to_string() }))
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse {
    Json(HealthOut { ok: true })
}

#[instrument(level = "info", skip(state, body), fields(student = %body.student, minutes = body.minutes))]
pub async fn http_post_practice(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PracticeIn>,
) -> impl IntoResponse {
    match logic::record_practice_event(&state, body).await {
        Ok(out) => {
            info!(target: "gamify_backend", earned = out.newly_earned.len(), "Practice event accepted");
            Json(out).into_response()
        }
        Err(e) => error_response(e).into_response(),
    }
}

#[instrument(level = "info", skip(state, q), fields(student = %q.student))]
pub async fn http_post_init(
    State(state): State<Arc<AppState>>,
    Json(q): Json<StudentQuery>,
) -> impl IntoResponse {
    match logic::initialize_student(&state, &q.student).await {
        Ok(out) => {
            info!(target: "gamify_backend", challenges = out.challenges.len(), "Student initialized");
            Json(out).into_response()
        }
        Err(e) => error_response(e).into_response(),
    }
}

#[instrument(level = "info", skip(state), fields(student = %q.student))]
pub async fn http_get_level(
    State(state): State<Arc<AppState>>,
    Query(q): Query<StudentQuery>,
) -> impl IntoResponse {
    match logic::get_level_info(&state, &q.student).await {
        Ok(info) => Json(LevelEnvelopeOut { initialized: true, info: Some(info) }),
        Err(GamifyError::NotInitialized) => Json(LevelEnvelopeOut { initialized: false, info: None }),
        Err(e) => return error_response(e).into_response(),
    }
    .into_response()
}

#[instrument(level = "info", skip(state), fields(student = %q.student))]
pub async fn http_get_achievements(
    State(state): State<Arc<AppState>>,
    Query(q): Query<AchievementsQuery>,
) -> impl IntoResponse {
    let list = logic::get_achievements(&state, &q.student, q.category, q.earned_only).await;
    Json(list)
}

#[instrument(level = "info", skip(state), fields(student = %q.student))]
pub async fn http_get_challenges(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ChallengesQuery>,
) -> impl IntoResponse {
    let list = logic::get_challenges(&state, &q.student, q.week_start, q.status).await;
    Json(list)
}

#[instrument(level = "info", skip(state), fields(student = %q.student))]
pub async fn http_get_challenge_stats(
    State(state): State<Arc<AppState>>,
    Query(q): Query<StudentQuery>,
) -> impl IntoResponse {
    Json(logic::challenge_statistics(&state, &q.student).await)
}

#[instrument(level = "info", skip(state), fields(student = %q.student))]
pub async fn http_get_suggestions(
    State(state): State<Arc<AppState>>,
    Query(q): Query<StudentQuery>,
) -> impl IntoResponse {
    Json(logic::suggest_next_actions(&state, &q.student).await)
}

#[instrument(level = "info", skip(state), fields(student = %q.student))]
pub async fn http_get_dashboard(
    State(state): State<Arc<AppState>>,
    Query(q): Query<StudentQuery>,
) -> impl IntoResponse {
    Json(logic::get_dashboard(&state, &q.student).await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_leaderboard(
    State(state): State<Arc<AppState>>,
    Query(q): Query<LeaderboardQuery>,
) -> impl IntoResponse {
    Json(logic::leaderboard(&state, q.limit.unwrap_or(10)).await)
}

#[instrument(level = "info", skip(state, body), fields(student = %body.student, title = %body.title))]
pub async fn http_post_task(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TaskIn>,
) -> impl IntoResponse {
    match logic::create_task(&state, body).await {
        Ok(task) => Json(task).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

#[instrument(level = "info", skip(state, body), fields(student = %body.student, task = %body.task_id))]
pub async fn http_post_task_complete(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TaskCompleteIn>,
) -> impl IntoResponse {
    match logic::complete_task(&state, body).await {
        Ok(task) => Json(task).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

#[instrument(level = "info", skip(state), fields(student = %q.student))]
pub async fn http_get_tasks(
    State(state): State<Arc<AppState>>,
    Query(q): Query<TasksQuery>,
) -> impl IntoResponse {
    Json(logic::get_tasks(&state, &q.student, q.status).await)
}
