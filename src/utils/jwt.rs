// src/utils/jwt.rs

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, models::session::AuthContext, state::AppState};

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - the user id.
    pub sub: String,
    /// Session id; the credential dies with its session row.
    pub sid: String,
    /// Issued at, Unix timestamp.
    pub iat: usize,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

/// Signs the bearer credential for a session.
pub fn sign_jwt(
    user_id: &str,
    session_id: &str,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    secret: &str,
) -> Result<String, AppError> {
    let claims = Claims {
        sub: user_id.to_owned(),
        sid: session_id.to_owned(),
        iat: unix_seconds(issued_at),
        exp: unix_seconds(expires_at),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

fn unix_seconds(at: DateTime<Utc>) -> usize {
    usize::try_from(at.timestamp()).unwrap_or(0)
}

/// Verifies and decodes a JWT string.
///
/// Returns the `Claims` if valid, otherwise returns an `AppError`.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid session".to_string()))?;

    Ok(token_data.claims)
}

/// Pulls the token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(req_headers: &axum::http::HeaderMap) -> Option<&str> {
    req_headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Axum Middleware: Authentication.
///
/// Validates the bearer credential, checks that its session still exists and
/// has not expired, reloads the user, and injects an `AuthContext` into the
/// request extensions. Anything missing or stale is 401.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers())
        .ok_or(AppError::AuthError("Not authenticated".to_string()))?;

    let claims = verify_jwt(token, &state.config.jwt_secret)?;

    let session = state
        .store
        .find_session(&claims.sid)
        .await?
        .filter(|s| s.user_id == claims.sub)
        .ok_or(AppError::AuthError("Invalid session".to_string()))?;

    if session.is_expired(Utc::now()) {
        return Err(AppError::AuthError("Session expired".to_string()));
    }

    let user = state
        .store
        .get_user(&session.user_id)
        .await?
        .ok_or(AppError::AuthError("User not found".to_string()))?;

    req.extensions_mut().insert(AuthContext { user });
    Ok(next.run(req).await)
}
