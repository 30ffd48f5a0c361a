// src/identity.rs

//! Exchange of the identity redirect's opaque `session_id` for a profile.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::error::AppError;

/// Profile returned by the identity provider.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IdentityProfile {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub picture: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolves a one-time `session_id`. Any failure is an authentication failure.
    async fn exchange(&self, session_id: &str) -> Result<IdentityProfile, AppError>;
}

/// Calls the provider's session-data endpoint with an `X-Session-ID` header.
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    url: Url,
}

impl HttpIdentityProvider {
    pub fn new(url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn exchange(&self, session_id: &str) -> Result<IdentityProfile, AppError> {
        let response = self
            .client
            .get(self.url.clone())
            .header("X-Session-ID", session_id)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                tracing::warn!("Identity exchange failed: {:?}", e);
                AppError::AuthError(format!("Failed to validate session: {}", e))
            })?;

        let profile = response.json::<IdentityProfile>().await.map_err(|e| {
            tracing::warn!("Identity provider returned an unreadable profile: {:?}", e);
            AppError::AuthError(format!("Failed to validate session: {}", e))
        })?;

        if profile.email.trim().is_empty() {
            return Err(AppError::AuthError(
                "Identity provider returned no email".to_string(),
            ));
        }
        Ok(profile)
    }
}
