// src/models/session.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppError,
    models::user::{Capability, Role, User},
};

/// Represents the 'user_sessions' table in the database.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub session_id: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// The authenticated caller of a request.
///
/// Built by the auth middleware from the bearer credential and a fresh user
/// read, then handed to handlers as a request extension.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
}

impl AuthContext {
    /// Fails with 403 unless the caller's role grants `capability`.
    pub fn require(&self, capability: Capability) -> Result<(), AppError> {
        if self.user.can(capability) {
            return Ok(());
        }
        let message = match capability {
            Capability::AuthorPosts => "Only owners can create posts",
            Capability::ManageSubscriptions => "Only owners can manage subscriptions",
            Capability::ManageMembers => "Only owners can manage members",
        };
        Err(AppError::Forbidden(message.to_string()))
    }

    /// Gate for member content when the club requires a current subscription.
    pub fn require_subscription(&self, enforced: bool, now: DateTime<Utc>) -> Result<(), AppError> {
        if !enforced || self.user.role == Role::Owner || self.user.has_current_subscription(now) {
            return Ok(());
        }
        Err(AppError::Forbidden(
            "Your subscription is inactive. Please contact the club owner to activate your membership."
                .to_string(),
        ))
    }
}

/// Response of the login exchange: the user plus the bearer credential.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub user: User,
    pub session_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::SubscriptionStatus;

    fn context(role: Role) -> AuthContext {
        let mut user = User::new_member("m@example.com", "M", None, Utc::now());
        user.role = role;
        AuthContext { user }
    }

    #[test]
    fn member_cannot_author() {
        let ctx = context(Role::Member);
        assert!(matches!(
            ctx.require(Capability::AuthorPosts),
            Err(AppError::Forbidden(_))
        ));
        assert!(context(Role::Owner).require(Capability::AuthorPosts).is_ok());
    }

    #[test]
    fn subscription_gate_only_when_enforced() {
        let now = Utc::now();
        let inactive = context(Role::Member);
        assert!(inactive.require_subscription(false, now).is_ok());
        assert!(inactive.require_subscription(true, now).is_err());

        let mut active = context(Role::Member);
        active.user.subscription_status = SubscriptionStatus::Active;
        assert!(active.require_subscription(true, now).is_ok());

        assert!(context(Role::Owner).require_subscription(true, now).is_ok());
    }
}
