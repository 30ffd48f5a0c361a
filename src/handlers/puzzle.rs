// src/handlers/puzzle.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        puzzle::{AttemptResponse, PuzzleAttemptState, SubmitAttemptRequest},
        session::AuthContext,
    },
    state::AppState,
};

/// Submits an answer for a puzzle.
///
/// Rejected submissions (already solved, no attempts left) return 200 with
/// `accepted: false` and are not counted.
#[utoipa::path(
    post,
    path = "/api/puzzles/submit",
    request_body = SubmitAttemptRequest,
    responses(
        (status = 200, description = "Submission resolved", body = AttemptResponse),
        (status = 400, description = "Blank answer or not a puzzle"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Subscription required"),
        (status = 404, description = "Post not found")
    ),
    tag = "puzzles"
)]
pub async fn submit_attempt(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_subscription(state.config.require_active_subscription, Utc::now())?;

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let response = state
        .tracker
        .submit_attempt(&auth.user.user_id, &payload.post_id, &payload.answer)
        .await?;

    Ok(Json(response))
}

/// The caller's attempt state on one puzzle.
#[utoipa::path(
    get,
    path = "/api/puzzles/{post_id}/status",
    params(("post_id" = String, Path, description = "Puzzle post id")),
    responses(
        (status = 200, description = "Attempt state", body = PuzzleAttemptState),
        (status = 400, description = "Not a puzzle"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Post not found")
    ),
    tag = "puzzles"
)]
pub async fn get_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let status = state.tracker.get_status(&auth.user.user_id, &post_id).await?;
    Ok(Json(status))
}
