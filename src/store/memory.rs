// src/store/memory.rs

//! In-process store for tests and local runs. Same semantics as `PgStore`,
//! with the attempt compare-and-swap performed under the write lock.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    config::MAX_PUZZLE_ATTEMPTS,
    models::{
        post::Post,
        puzzle::PuzzleAttempt,
        session::Session,
        user::{Role, SubscriptionStatus, User},
    },
    store::{AttemptInsert, ClubStore, StoreError, StoreResult},
};

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    sessions: HashMap<String, Session>,
    posts: HashMap<String, Post>,
    attempts: HashMap<(String, String), Vec<PuzzleAttempt>>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClubStore for MemoryStore {
    async fn upsert_identity(&self, candidate: User) -> StoreResult<User> {
        let mut tables = self.tables.write().await;

        if let Some(existing) = tables
            .users
            .values_mut()
            .find(|u| u.email == candidate.email)
        {
            existing.name = candidate.name;
            existing.picture = candidate.picture;
            return Ok(existing.clone());
        }

        tables
            .users
            .insert(candidate.user_id.clone(), candidate.clone());
        Ok(candidate)
    }

    async fn get_user(&self, user_id: &str) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(user_id).cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self.tables.read().await.users.values().cloned().collect();
        users.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.user_id.cmp(&a.user_id))
        });
        Ok(users)
    }

    async fn set_role_by_email(&self, email: &str, role: Role) -> StoreResult<Option<User>> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .users
            .values_mut()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .map(|user| {
                user.role = role;
                user.clone()
            }))
    }

    async fn update_subscription(
        &self,
        user_id: &str,
        status: SubscriptionStatus,
        expires_at: Option<DateTime<Utc>>,
    ) -> StoreResult<Option<User>> {
        let mut tables = self.tables.write().await;
        Ok(tables.users.get_mut(user_id).map(|user| {
            user.subscription_status = status;
            user.subscription_expires_at = expires_at;
            user.clone()
        }))
    }

    async fn save_push_token(&self, user_id: &str, token: &str) -> StoreResult<()> {
        if let Some(user) = self.tables.write().await.users.get_mut(user_id) {
            user.push_token = Some(token.to_string());
        }
        Ok(())
    }

    async fn active_member_push_tokens(&self) -> StoreResult<Vec<String>> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .filter(|u| u.role == Role::Member && u.subscription_status == SubscriptionStatus::Active)
            .filter_map(|u| u.push_token.clone())
            .collect())
    }

    async fn create_session(&self, session: Session) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .sessions
            .insert(session.session_id.clone(), session);
        Ok(())
    }

    async fn find_session(&self, session_id: &str) -> StoreResult<Option<Session>> {
        Ok(self.tables.read().await.sessions.get(session_id).cloned())
    }

    async fn delete_session(&self, session_id: &str) -> StoreResult<()> {
        self.tables.write().await.sessions.remove(session_id);
        Ok(())
    }

    async fn insert_post(&self, post: Post) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.posts.contains_key(&post.post_id) {
            return Err(StoreError::Database(format!(
                "duplicate post id {}",
                post.post_id
            )));
        }
        tables.posts.insert(post.post_id.clone(), post);
        Ok(())
    }

    async fn get_post(&self, post_id: &str) -> StoreResult<Option<Post>> {
        Ok(self.tables.read().await.posts.get(post_id).cloned())
    }

    async fn list_posts(&self, limit: i64) -> StoreResult<Vec<Post>> {
        let mut posts: Vec<Post> = self.tables.read().await.posts.values().cloned().collect();
        posts.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.post_id.cmp(&a.post_id))
        });
        posts.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(posts)
    }

    async fn latest_puzzle(&self) -> StoreResult<Option<Post>> {
        Ok(self
            .tables
            .read()
            .await
            .posts
            .values()
            .filter(|p| p.is_puzzle())
            .max_by(|a, b| {
                a.created_at
                    .cmp(&b.created_at)
                    .then_with(|| a.post_id.cmp(&b.post_id))
            })
            .cloned())
    }

    async fn puzzle_attempts(&self, user_id: &str, post_id: &str) -> StoreResult<Vec<PuzzleAttempt>> {
        let key = (user_id.to_string(), post_id.to_string());
        Ok(self
            .tables
            .read()
            .await
            .attempts
            .get(&key)
            .cloned()
            .unwrap_or_default())
    }

    async fn record_attempt(&self, attempt: PuzzleAttempt) -> StoreResult<AttemptInsert> {
        if attempt.attempt_number == 0 || attempt.attempt_number > MAX_PUZZLE_ATTEMPTS {
            return Err(StoreError::Database(format!(
                "attempt number {} out of range",
                attempt.attempt_number
            )));
        }

        let mut tables = self.tables.write().await;
        let key = (attempt.user_id.clone(), attempt.post_id.clone());
        let attempts = tables.attempts.entry(key).or_default();

        let next = u32::try_from(attempts.len()).unwrap_or(u32::MAX).saturating_add(1);
        if attempt.attempt_number != next {
            return Ok(AttemptInsert::Conflict);
        }

        attempts.push(attempt);
        Ok(AttemptInsert::Recorded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(n: u32) -> PuzzleAttempt {
        PuzzleAttempt {
            attempt_id: format!("attempt_{}", n),
            user_id: "user_a".to_string(),
            post_id: "post_a".to_string(),
            answer: "e4".to_string(),
            is_correct: false,
            attempt_number: n,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn attempt_number_is_compare_and_swap() {
        let store = MemoryStore::new();
        assert_eq!(store.record_attempt(attempt(1)).await.unwrap(), AttemptInsert::Recorded);
        assert_eq!(store.record_attempt(attempt(1)).await.unwrap(), AttemptInsert::Conflict);
        assert_eq!(store.record_attempt(attempt(2)).await.unwrap(), AttemptInsert::Recorded);
        assert!(store.record_attempt(attempt(3)).await.is_err());

        let stored = store.puzzle_attempts("user_a", "post_a").await.unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn upsert_identity_refreshes_profile_by_email() {
        let store = MemoryStore::new();
        let first = store
            .upsert_identity(User::new_member("k@example.com", "Kasparov", None, Utc::now()))
            .await
            .unwrap();

        let again = store
            .upsert_identity(User::new_member(
                "k@example.com",
                "Garry",
                Some("https://example.com/g.png".to_string()),
                Utc::now(),
            ))
            .await
            .unwrap();

        assert_eq!(again.user_id, first.user_id);
        assert_eq!(again.name, "Garry");
        assert_eq!(store.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn push_tokens_only_for_active_members() {
        let store = MemoryStore::new();
        let active = store
            .upsert_identity(User::new_member("a@example.com", "A", None, Utc::now()))
            .await
            .unwrap();
        let inactive = store
            .upsert_identity(User::new_member("b@example.com", "B", None, Utc::now()))
            .await
            .unwrap();

        store
            .update_subscription(&active.user_id, SubscriptionStatus::Active, None)
            .await
            .unwrap();
        store.save_push_token(&active.user_id, "tok-a").await.unwrap();
        store.save_push_token(&inactive.user_id, "tok-b").await.unwrap();

        assert_eq!(store.active_member_push_tokens().await.unwrap(), vec!["tok-a"]);
    }
}
