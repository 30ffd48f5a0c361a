// src/models/post.rs

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::{error::AppError, models::user::short_id, utils::html::plain_text};

static IMAGE_DATA_URI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^data:image/(png|jpe?g|gif|webp);base64,[A-Za-z0-9+/]+={0,2}$")
        .expect("image data uri pattern is valid")
});

/// The hidden part of a puzzle post.
#[derive(Debug, Clone, PartialEq)]
pub struct Puzzle {
    /// Expected answer in move notation, trimmed at authoring time.
    pub answer: String,
    pub success_message: Option<String>,
    pub failure_message: Option<String>,
}

/// A feed item. Immutable once created.
///
/// Deliberately not `Serialize`: the puzzle answer must go through `PublicPost`.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub post_id: String,
    pub title: String,
    pub content: String,
    /// `data:image/...;base64,` payload.
    pub image: Option<String>,
    pub puzzle: Option<Puzzle>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Post {
    pub fn is_puzzle(&self) -> bool {
        self.puzzle.is_some()
    }
}

/// Post as delivered to clients. Never carries the answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PublicPost {
    pub post_id: String,
    pub title: String,
    pub content: String,
    pub image: Option<String>,
    pub is_puzzle: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Post> for PublicPost {
    fn from(post: &Post) -> Self {
        Self {
            post_id: post.post_id.clone(),
            title: post.title.clone(),
            content: post.content.clone(),
            image: post.image.clone(),
            is_puzzle: post.is_puzzle(),
            created_by: post.created_by.clone(),
            created_at: post.created_at,
        }
    }
}

/// DTO for creating a new post or puzzle.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreatePostRequest {
    #[validate(
        length(max = 200, message = "Title must be at most 200 chars"),
        custom(function = not_blank, message = "Title is required")
    )]
    pub title: String,

    #[validate(
        length(max = 10000, message = "Content must be at most 10000 chars"),
        custom(function = not_blank, message = "Content is required")
    )]
    pub content: String,

    #[validate(custom(function = validate_image))]
    pub image: Option<String>,

    #[serde(default)]
    pub is_puzzle: bool,

    #[validate(length(max = 100, message = "Puzzle answer must be at most 100 chars"))]
    pub puzzle_answer: Option<String>,

    #[validate(length(max = 500))]
    pub success_message: Option<String>,

    #[validate(length(max = 500))]
    pub failure_message: Option<String>,
}

impl CreatePostRequest {
    /// Field validation plus the cross-field rule: a puzzle needs an answer.
    pub fn check(&self) -> Result<(), AppError> {
        if let Err(validation_errors) = self.validate() {
            return Err(AppError::BadRequest(validation_errors.to_string()));
        }

        if self.is_puzzle
            && self
                .puzzle_answer
                .as_deref()
                .is_none_or(|answer| answer.trim().is_empty())
        {
            return Err(AppError::BadRequest(
                "Please provide the puzzle answer".to_string(),
            ));
        }

        Ok(())
    }

    /// Builds the stored post. Call `check` first.
    ///
    /// Text is sanitized, the answer trimmed, and puzzle fields dropped for plain posts.
    /// Length limits are enforced again on the sanitized values, which are what gets stored.
    pub fn into_post(self, author_id: &str, now: DateTime<Utc>) -> Result<Post, AppError> {
        let puzzle = if self.is_puzzle {
            Some(Puzzle {
                answer: self.puzzle_answer.unwrap_or_default().trim().to_string(),
                success_message: message_text("Success message", self.success_message)?,
                failure_message: message_text("Failure message", self.failure_message)?,
            })
        } else {
            None
        };

        Ok(Post {
            post_id: format!("post_{}", short_id()),
            title: stored_text("Title", plain_text(self.title.trim()).trim(), TITLE_MAX_CHARS)?,
            content: stored_text("Content", &plain_text(&self.content), CONTENT_MAX_CHARS)?,
            image: self.image,
            puzzle,
            created_by: author_id.to_string(),
            created_at: now,
        })
    }
}

const TITLE_MAX_CHARS: usize = 200;
const CONTENT_MAX_CHARS: usize = 10000;
const MESSAGE_MAX_CHARS: usize = 500;

fn stored_text(field: &str, value: &str, max_chars: usize) -> Result<String, AppError> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{} is required", field)));
    }
    if value.chars().count() > max_chars {
        return Err(AppError::BadRequest(format!(
            "{} must be at most {} chars",
            field, max_chars
        )));
    }
    Ok(value.to_string())
}

/// Blank messages fall back to the defaults.
fn message_text(field: &str, message: Option<String>) -> Result<Option<String>, AppError> {
    match message.map(|m| plain_text(m.trim()).trim().to_string()) {
        Some(m) if !m.is_empty() => stored_text(field, &m, MESSAGE_MAX_CHARS).map(Some),
        _ => Ok(None),
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

fn validate_image(value: &str) -> Result<(), ValidationError> {
    if !IMAGE_DATA_URI.is_match(value) {
        return Err(ValidationError::new("image_must_be_base64_data_uri"));
    }
    Ok(())
}

/// Query parameters for listing posts.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PostListParams {
    /// Number of items to return (default and max: 100).
    pub limit: Option<i64>,
}
