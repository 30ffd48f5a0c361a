// src/store/postgres.rs

//! PostgreSQL implementation of `ClubStore` using sqlx.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use crate::{
    models::{
        post::{Post, Puzzle},
        puzzle::PuzzleAttempt,
        session::Session,
        user::{Role, SubscriptionStatus, User},
    },
    store::{AttemptInsert, ClubStore, StoreError, StoreResult},
};

const USER_COLUMNS: &str = "user_id, email, name, picture, role, subscription_status, \
     subscription_expires_at, push_token, created_at";

const POST_COLUMNS: &str = "post_id, title, content, image, is_puzzle, puzzle_answer, \
     success_message, failure_message, created_by, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded migrations.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |e| {
        tracing::error!("{}: {:?}", context, e);
        StoreError::Database(e.to_string())
    }
}

#[derive(FromRow)]
struct UserRecord {
    user_id: String,
    email: String,
    name: String,
    picture: Option<String>,
    role: String,
    subscription_status: String,
    subscription_expires_at: Option<DateTime<Utc>>,
    push_token: Option<String>,
    created_at: DateTime<Utc>,
}

impl UserRecord {
    fn into_domain(self) -> StoreResult<User> {
        Ok(User {
            role: self.role.parse::<Role>().map_err(StoreError::Corrupt)?,
            subscription_status: self
                .subscription_status
                .parse::<SubscriptionStatus>()
                .map_err(StoreError::Corrupt)?,
            user_id: self.user_id,
            email: self.email,
            name: self.name,
            picture: self.picture,
            subscription_expires_at: self.subscription_expires_at,
            push_token: self.push_token,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct SessionRecord {
    session_id: String,
    user_id: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<SessionRecord> for Session {
    fn from(r: SessionRecord) -> Self {
        Session {
            session_id: r.session_id,
            user_id: r.user_id,
            expires_at: r.expires_at,
            created_at: r.created_at,
        }
    }
}

#[derive(FromRow)]
struct PostRecord {
    post_id: String,
    title: String,
    content: String,
    image: Option<String>,
    is_puzzle: bool,
    puzzle_answer: Option<String>,
    success_message: Option<String>,
    failure_message: Option<String>,
    created_by: String,
    created_at: DateTime<Utc>,
}

impl PostRecord {
    fn into_domain(self) -> StoreResult<Post> {
        let puzzle = match (self.is_puzzle, self.puzzle_answer) {
            (true, Some(answer)) => Some(Puzzle {
                answer,
                success_message: self.success_message,
                failure_message: self.failure_message,
            }),
            (true, None) => {
                return Err(StoreError::Corrupt(format!(
                    "puzzle {} has no answer",
                    self.post_id
                )));
            }
            (false, _) => None,
        };

        Ok(Post {
            post_id: self.post_id,
            title: self.title,
            content: self.content,
            image: self.image,
            puzzle,
            created_by: self.created_by,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct AttemptRecord {
    attempt_id: String,
    user_id: String,
    post_id: String,
    answer: String,
    is_correct: bool,
    attempt_number: i32,
    created_at: DateTime<Utc>,
}

impl AttemptRecord {
    fn into_domain(self) -> StoreResult<PuzzleAttempt> {
        let attempt_number = u32::try_from(self.attempt_number).map_err(|_| {
            StoreError::Corrupt(format!("negative attempt number in {}", self.attempt_id))
        })?;
        Ok(PuzzleAttempt {
            attempt_id: self.attempt_id,
            user_id: self.user_id,
            post_id: self.post_id,
            answer: self.answer,
            is_correct: self.is_correct,
            attempt_number,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl ClubStore for PgStore {
    async fn upsert_identity(&self, candidate: User) -> StoreResult<User> {
        let sql = format!(
            r#"
            INSERT INTO users (user_id, email, name, picture, role, subscription_status, subscription_expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (email) DO UPDATE SET
                name = EXCLUDED.name,
                picture = EXCLUDED.picture
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(&candidate.user_id)
            .bind(&candidate.email)
            .bind(&candidate.name)
            .bind(&candidate.picture)
            .bind(candidate.role.as_str())
            .bind(candidate.subscription_status.as_str())
            .bind(candidate.subscription_expires_at)
            .bind(candidate.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to upsert user"))?
            .into_domain()
    }

    async fn get_user(&self, user_id: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = $1");
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to fetch user"))?
            .map(UserRecord::into_domain)
            .transpose()
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, user_id DESC");
        sqlx::query_as::<_, UserRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list users"))?
            .into_iter()
            .map(UserRecord::into_domain)
            .collect()
    }

    async fn set_role_by_email(&self, email: &str, role: Role) -> StoreResult<Option<User>> {
        let sql = format!(
            "UPDATE users SET role = $1 WHERE LOWER(email) = LOWER($2) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(role.as_str())
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to update role"))?
            .map(UserRecord::into_domain)
            .transpose()
    }

    async fn update_subscription(
        &self,
        user_id: &str,
        status: SubscriptionStatus,
        expires_at: Option<DateTime<Utc>>,
    ) -> StoreResult<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users
            SET subscription_status = $1, subscription_expires_at = $2
            WHERE user_id = $3
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(status.as_str())
            .bind(expires_at)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to update subscription"))?
            .map(UserRecord::into_domain)
            .transpose()
    }

    async fn save_push_token(&self, user_id: &str, token: &str) -> StoreResult<()> {
        sqlx::query("UPDATE users SET push_token = $1 WHERE user_id = $2")
            .bind(token)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to save push token"))?;
        Ok(())
    }

    async fn active_member_push_tokens(&self) -> StoreResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT push_token FROM users
            WHERE role = 'member'
              AND subscription_status = 'active'
              AND push_token IS NOT NULL
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to fetch push tokens"))
    }

    async fn create_session(&self, session: Session) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO user_sessions (session_id, user_id, expires_at, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&session.session_id)
        .bind(&session.user_id)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to create session"))?;
        Ok(())
    }

    async fn find_session(&self, session_id: &str) -> StoreResult<Option<Session>> {
        let record = sqlx::query_as::<_, SessionRecord>(
            "SELECT session_id, user_id, expires_at, created_at FROM user_sessions WHERE session_id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch session"))?;
        Ok(record.map(Session::from))
    }

    async fn delete_session(&self, session_id: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM user_sessions WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete session"))?;
        Ok(())
    }

    async fn insert_post(&self, post: Post) -> StoreResult<()> {
        let (answer, success, failure) = match &post.puzzle {
            Some(p) => (
                Some(p.answer.as_str()),
                p.success_message.as_deref(),
                p.failure_message.as_deref(),
            ),
            None => (None, None, None),
        };

        let sql = format!(
            "INSERT INTO posts ({POST_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        );
        sqlx::query(&sql)
            .bind(&post.post_id)
            .bind(&post.title)
            .bind(&post.content)
            .bind(&post.image)
            .bind(post.is_puzzle())
            .bind(answer)
            .bind(success)
            .bind(failure)
            .bind(&post.created_by)
            .bind(post.created_at)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to create post"))?;
        Ok(())
    }

    async fn get_post(&self, post_id: &str) -> StoreResult<Option<Post>> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE post_id = $1");
        sqlx::query_as::<_, PostRecord>(&sql)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to fetch post"))?
            .map(PostRecord::into_domain)
            .transpose()
    }

    async fn list_posts(&self, limit: i64) -> StoreResult<Vec<Post>> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts ORDER BY created_at DESC, post_id DESC LIMIT $1"
        );
        sqlx::query_as::<_, PostRecord>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list posts"))?
            .into_iter()
            .map(PostRecord::into_domain)
            .collect()
    }

    async fn latest_puzzle(&self) -> StoreResult<Option<Post>> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE is_puzzle ORDER BY created_at DESC, post_id DESC LIMIT 1"
        );
        sqlx::query_as::<_, PostRecord>(&sql)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to fetch latest puzzle"))?
            .map(PostRecord::into_domain)
            .transpose()
    }

    async fn puzzle_attempts(&self, user_id: &str, post_id: &str) -> StoreResult<Vec<PuzzleAttempt>> {
        sqlx::query_as::<_, AttemptRecord>(
            r#"
            SELECT attempt_id, user_id, post_id, answer, is_correct, attempt_number, created_at
            FROM puzzle_attempts
            WHERE user_id = $1 AND post_id = $2
            ORDER BY attempt_number
            "#,
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to fetch puzzle attempts"))?
        .into_iter()
        .map(AttemptRecord::into_domain)
        .collect()
    }

    async fn record_attempt(&self, attempt: PuzzleAttempt) -> StoreResult<AttemptInsert> {
        let attempt_number = i32::try_from(attempt.attempt_number)
            .map_err(|_| StoreError::Database("attempt number out of range".to_string()))?;

        let result = sqlx::query(
            r#"
            INSERT INTO puzzle_attempts (attempt_id, user_id, post_id, answer, is_correct, attempt_number, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id, post_id, attempt_number) DO NOTHING
            "#,
        )
        .bind(&attempt.attempt_id)
        .bind(&attempt.user_id)
        .bind(&attempt.post_id)
        .bind(&attempt.answer)
        .bind(attempt.is_correct)
        .bind(attempt_number)
        .bind(attempt.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to record puzzle attempt"))?;

        if result.rows_affected() == 0 {
            return Ok(AttemptInsert::Conflict);
        }
        Ok(AttemptInsert::Recorded)
    }
}
