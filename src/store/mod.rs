// src/store/mod.rs

//! Persistence contract for users, sessions, posts and puzzle attempts.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{
    post::Post,
    puzzle::PuzzleAttempt,
    session::Session,
    user::{Role, SubscriptionStatus, User},
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug)]
pub enum StoreError {
    /// The backend failed (connection, query, constraint other than the attempt key).
    Database(String),
    /// A stored row could not be mapped back to the domain.
    Corrupt(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Database(msg) => write!(f, "database error: {}", msg),
            StoreError::Corrupt(msg) => write!(f, "corrupt record: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of the attempt compare-and-swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptInsert {
    Recorded,
    /// Another submission already took this attempt number.
    Conflict,
}

#[async_trait]
pub trait ClubStore: Send + Sync {
    // --- Users ---

    /// Inserts `candidate`, or when its email is already known refreshes that
    /// user's name and picture and returns the stored user.
    async fn upsert_identity(&self, candidate: User) -> StoreResult<User>;
    async fn get_user(&self, user_id: &str) -> StoreResult<Option<User>>;
    /// Newest first.
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    /// Returns the updated user, `None` when no user has that email.
    async fn set_role_by_email(&self, email: &str, role: Role) -> StoreResult<Option<User>>;
    async fn update_subscription(
        &self,
        user_id: &str,
        status: SubscriptionStatus,
        expires_at: Option<DateTime<Utc>>,
    ) -> StoreResult<Option<User>>;
    async fn save_push_token(&self, user_id: &str, token: &str) -> StoreResult<()>;
    /// Push tokens of members whose subscription status is active.
    async fn active_member_push_tokens(&self) -> StoreResult<Vec<String>>;

    // --- Sessions ---

    async fn create_session(&self, session: Session) -> StoreResult<()>;
    async fn find_session(&self, session_id: &str) -> StoreResult<Option<Session>>;
    async fn delete_session(&self, session_id: &str) -> StoreResult<()>;

    // --- Posts ---

    async fn insert_post(&self, post: Post) -> StoreResult<()>;
    async fn get_post(&self, post_id: &str) -> StoreResult<Option<Post>>;
    /// Newest first, ties by id descending.
    async fn list_posts(&self, limit: i64) -> StoreResult<Vec<Post>>;
    /// The most recent puzzle post, same ordering as `list_posts`.
    async fn latest_puzzle(&self) -> StoreResult<Option<Post>>;

    // --- Puzzle attempts ---

    /// Attempts of one user on one puzzle, in attempt order.
    async fn puzzle_attempts(&self, user_id: &str, post_id: &str) -> StoreResult<Vec<PuzzleAttempt>>;

    /// Stores `attempt` unless its `attempt_number` is already taken for the
    /// (user, post) pair. This is the serialization point for concurrent submissions.
    async fn record_attempt(&self, attempt: PuzzleAttempt) -> StoreResult<AttemptInsert>;
}
