// src/handlers/auth.rs

use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use serde_json::json;

use crate::{
    error::AppError,
    models::{
        session::{AuthContext, Session, SessionResponse},
        user::{PushTokenRequest, Role, User},
    },
    state::AppState,
    utils::jwt::{bearer_token, sign_jwt, verify_jwt},
};

pub const SESSION_ID_HEADER: &str = "X-Session-ID";

/// Exchanges the identity redirect's `session_id` for a session credential.
///
/// * Resolves the profile with the identity provider.
/// * Creates the user on first login (member, inactive) or refreshes name and picture.
/// * Promotes the configured owner email.
/// * Stores a session and returns the user with a signed bearer token.
#[utoipa::path(
    post,
    path = "/api/auth/session",
    params(("X-Session-ID" = String, Header, description = "Opaque id from the identity redirect")),
    responses(
        (status = 200, description = "Signed in", body = SessionResponse),
        (status = 400, description = "Missing session id header"),
        (status = 401, description = "Identity provider rejected the session id")
    ),
    tag = "auth"
)]
pub async fn create_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let session_id = headers
        .get(SESSION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(AppError::BadRequest(format!(
            "{} header required",
            SESSION_ID_HEADER
        )))?;

    let profile = state.identity.exchange(session_id).await?;
    let now = Utc::now();
    let email = profile.email.trim().to_lowercase();

    let mut user = state
        .store
        .upsert_identity(User::new_member(&email, &profile.name, profile.picture, now))
        .await?;

    if user.role != Role::Owner && state.config.owner_email.as_deref() == Some(email.as_str()) {
        tracing::info!("Promoting configured owner {}", email);
        if let Some(promoted) = state.store.set_role_by_email(&email, Role::Owner).await? {
            user = promoted;
        }
    }

    let session = Session {
        session_id: format!("session_{}", uuid::Uuid::new_v4().simple()),
        user_id: user.user_id.clone(),
        expires_at: now + Duration::days(state.config.session_ttl_days),
        created_at: now,
    };
    state.store.create_session(session.clone()).await?;

    let session_token = sign_jwt(
        &user.user_id,
        &session.session_id,
        session.created_at,
        session.expires_at,
        &state.config.jwt_secret,
    )?;

    tracing::info!("User {} signed in", user.user_id);

    Ok((StatusCode::OK, Json(SessionResponse { user, session_token })))
}

/// Returns the current user.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Not authenticated")
    ),
    tag = "auth"
)]
pub async fn me(Extension(auth): Extension<AuthContext>) -> Json<User> {
    Json(auth.user)
}

/// Ends the session behind the presented credential.
///
/// Succeeds without a credential or with one that no longer verifies.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 200, description = "Logged out")),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    if let Some(claims) =
        bearer_token(&headers).and_then(|token| verify_jwt(token, &state.config.jwt_secret).ok())
    {
        state.store.delete_session(&claims.sid).await?;
        tracing::info!("User {} logged out", claims.sub);
    }

    Ok(Json(json!({ "message": "Logged out successfully" })))
}

/// Stores the device push token of the current user.
#[utoipa::path(
    post,
    path = "/api/auth/push-token",
    request_body = PushTokenRequest,
    responses(
        (status = 200, description = "Saved"),
        (status = 400, description = "Empty token"),
        (status = 401, description = "Not authenticated")
    ),
    tag = "auth"
)]
pub async fn save_push_token(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<PushTokenRequest>,
) -> Result<impl IntoResponse, AppError> {
    let token = payload.push_token.trim();
    if token.is_empty() || token.len() > 512 {
        return Err(AppError::BadRequest("Invalid push token".to_string()));
    }

    state.store.save_push_token(&auth.user.user_id, token).await?;

    Ok(Json(json!({ "message": "Push token saved successfully" })))
}
