// src/client.rs

//! Typed HTTP client for the club API.
//!
//! The authentication context is an explicit `AuthSession` value owned by the
//! caller. Nothing is cached globally.

use std::fmt;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use url::Url;

use crate::{
    error::AppError,
    feed::FeedResponse,
    models::{
        club::ClubInfo,
        post::{CreatePostRequest, PublicPost},
        puzzle::{AttemptResponse, PuzzleAttemptState, SubmitAttemptRequest},
        session::SessionResponse,
        user::{SubscriptionResponse, User},
    },
};

#[derive(Debug)]
pub enum ClientError {
    /// 401. The session is gone and should be dropped.
    Unauthorized(String),
    /// 403.
    Forbidden(String),
    /// 400, or rejected locally before dispatch.
    Validation(String),
    Api { status: u16, message: String },
    /// The request never produced a response.
    Transport(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Unauthorized(msg) => write!(f, "unauthorized: {}", msg),
            ClientError::Forbidden(msg) => write!(f, "forbidden: {}", msg),
            ClientError::Validation(msg) => write!(f, "invalid request: {}", msg),
            ClientError::Api { status, message } => write!(f, "api error {}: {}", status, message),
            ClientError::Transport(msg) => write!(f, "transport error: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}

impl ClientError {
    fn from_status(status: StatusCode, message: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => ClientError::Unauthorized(message),
            StatusCode::FORBIDDEN => ClientError::Forbidden(message),
            StatusCode::BAD_REQUEST => ClientError::Validation(message),
            other => ClientError::Api {
                status: other.as_u16(),
                message,
            },
        }
    }
}

/// A signed-in user and the bearer credential for their session.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone)]
pub struct ClubClient {
    base_url: String,
    http: reqwest::Client,
}

impl ClubClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Appends each segment percent-encoded, so ids cannot alter the route.
    fn segments_url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::Validation(format!("invalid base url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Validation("base url cannot hold a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authed(&self, builder: RequestBuilder, session: &AuthSession) -> RequestBuilder {
        builder.bearer_auth(&session.token)
    }

    /// Exchanges the identity redirect's `session_id` for an `AuthSession`.
    pub async fn login(&self, session_id: &str) -> Result<AuthSession, ClientError> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(ClientError::Validation("Session id is required".to_string()));
        }

        let response = self
            .http
            .post(self.url("/api/auth/session"))
            .header("X-Session-ID", session_id)
            .send()
            .await?;

        let SessionResponse {
            user,
            session_token,
        } = decode(response).await?;

        Ok(AuthSession {
            token: session_token,
            user,
        })
    }

    /// Ends the session. The local context is cleared even when the call fails.
    pub async fn logout(&self, session: &mut Option<AuthSession>) {
        let Some(current) = session.take() else {
            return;
        };

        let result = self
            .authed(self.http.post(self.url("/api/auth/logout")), &current)
            .send()
            .await;

        if let Err(e) = result {
            tracing::warn!("Logout request failed, session dropped locally: {}", e);
        }
    }

    pub async fn me(&self, session: &AuthSession) -> Result<User, ClientError> {
        let response = self
            .authed(self.http.get(self.url("/api/auth/me")), session)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn club_info(&self) -> Result<ClubInfo, ClientError> {
        let response = self.http.get(self.url("/api/club-info")).send().await?;
        decode(response).await
    }

    pub async fn feed(&self, session: &AuthSession) -> Result<FeedResponse, ClientError> {
        let response = self
            .authed(self.http.get(self.url("/api/feed")), session)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn puzzle_status(
        &self,
        session: &AuthSession,
        post_id: &str,
    ) -> Result<PuzzleAttemptState, ClientError> {
        let url = self.segments_url(&["api", "puzzles", post_id, "status"])?;
        let response = self
            .authed(self.http.get(url), session)
            .send()
            .await?;
        decode(response).await
    }

    /// Re-reads the attempt state, keeping `known` when the read fails.
    pub async fn refresh_status(
        &self,
        session: &AuthSession,
        post_id: &str,
        known: PuzzleAttemptState,
    ) -> PuzzleAttemptState {
        match self.puzzle_status(session, post_id).await {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!("Failed to refresh puzzle {} status: {}", post_id, e);
                known
            }
        }
    }

    /// Submits an answer. A blank answer is rejected without a request.
    pub async fn submit_attempt(
        &self,
        session: &AuthSession,
        post_id: &str,
        answer: &str,
    ) -> Result<AttemptResponse, ClientError> {
        if answer.trim().is_empty() {
            return Err(ClientError::Validation("Please enter your answer".to_string()));
        }

        let body = SubmitAttemptRequest {
            post_id: post_id.to_string(),
            answer: answer.to_string(),
        };
        let response = self
            .authed(self.http.post(self.url("/api/puzzles/submit")), session)
            .json(&body)
            .send()
            .await?;
        decode(response).await
    }

    /// Publishes a post. The request is checked locally first.
    pub async fn create_post(
        &self,
        session: &AuthSession,
        request: &CreatePostRequest,
    ) -> Result<PublicPost, ClientError> {
        request.check().map_err(|e| match e {
            AppError::BadRequest(msg) => ClientError::Validation(msg),
            other => ClientError::Validation(other.to_string()),
        })?;

        let response = self
            .authed(self.http.post(self.url("/api/posts")), session)
            .json(request)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn subscription(
        &self,
        session: &AuthSession,
    ) -> Result<SubscriptionResponse, ClientError> {
        let response = self
            .authed(self.http.get(self.url("/api/subscription")), session)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn save_push_token(&self, session: &AuthSession, token: &str) -> Result<(), ClientError> {
        let response = self
            .authed(self.http.post(self.url("/api/auth/push-token")), session)
            .json(&json!({ "push_token": token }))
            .send()
            .await?;
        decode::<serde_json::Value>(response).await.map(|_| ())
    }
}

/// Parses a success body as `T`, or maps the `{"error": ...}` body to a `ClientError`.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Api {
                status: status.as_u16(),
                message: format!("unreadable response: {}", e),
            });
    }

    let text = response.text().await.unwrap_or_default();
    Err(ClientError::from_status(status, error_message(&text, status)))
}

fn error_message(body: &str, status: StatusCode) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| status.to_string())
}
