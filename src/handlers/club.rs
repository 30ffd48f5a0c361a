// src/handlers/club.rs

use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::{models::club::ClubInfo, state::AppState};

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service is up")),
    tag = "club"
)]
pub async fn health() -> Json<Value> {
    Json(json!({ "message": "Chess Club API", "status": "running" }))
}

/// Public club details. No authentication.
#[utoipa::path(
    get,
    path = "/api/club-info",
    responses((status = 200, description = "Club details", body = ClubInfo)),
    tag = "club"
)]
pub async fn club_info(State(state): State<AppState>) -> Json<ClubInfo> {
    Json(state.config.club.clone())
}
