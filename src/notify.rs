// src/notify.rs

//! Best-effort push notifications. Failures are logged, never surfaced.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Serialize;
use url::Url;

use crate::{error::AppError, models::post::Post, store::ClubStore};

/// One message in the Expo push API format.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushMessage {
    pub to: String,
    pub title: String,
    pub body: String,
    pub sound: &'static str,
    pub data: serde_json::Value,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers a batch. Returns how many messages were handed off.
    async fn send(&self, messages: Vec<PushMessage>) -> Result<usize, AppError>;
}

/// Posts batches to an Expo-compatible push gateway.
pub struct ExpoNotifier {
    client: reqwest::Client,
    url: Url,
}

impl ExpoNotifier {
    pub fn new(url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl Notifier for ExpoNotifier {
    async fn send(&self, messages: Vec<PushMessage>) -> Result<usize, AppError> {
        let count = messages.len();
        self.client
            .post(self.url.clone())
            .json(&messages)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::InternalServerError(format!("push gateway: {}", e)))?;
        Ok(count)
    }
}

/// Used when no gateway is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, messages: Vec<PushMessage>) -> Result<usize, AppError> {
        for message in &messages {
            tracing::info!(to = %message.to, title = %message.title, "Push notification (not sent)");
        }
        Ok(messages.len())
    }
}

pub fn puzzle_messages(tokens: Vec<String>, post: &Post) -> Vec<PushMessage> {
    tokens
        .into_iter()
        .map(|to| PushMessage {
            to,
            title: "New Daily Puzzle!".to_string(),
            body: post.title.clone(),
            sound: "default",
            data: serde_json::json!({ "type": "puzzle", "post_id": post.post_id }),
        })
        .collect()
}

/// Tells active members about a new puzzle without delaying the caller.
pub fn announce_puzzle(store: Arc<dyn ClubStore>, notifier: Arc<dyn Notifier>, post: Post) {
    tokio::spawn(async move {
        let tokens = match store.active_member_push_tokens().await {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::error!("Failed to load push tokens: {}", e);
                return;
            }
        };
        if tokens.is_empty() {
            return;
        }

        match notifier.send(puzzle_messages(tokens, &post)).await {
            Ok(sent) => tracing::info!("Sent puzzle notification to {} members", sent),
            Err(e) => tracing::error!("Failed to send notifications: {}", e),
        }
    });
}
