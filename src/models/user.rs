// src/models/user.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::SUBSCRIPTION_PERIOD_DAYS;

/// Club role. Stored as lowercase text in the 'users' table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Member,
}

/// Things a role may be allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Publish posts and puzzles.
    AuthorPosts,
    /// List members and activate, extend or deactivate subscriptions.
    ManageSubscriptions,
    /// Promote other users to owner.
    ManageMembers,
}

impl Role {
    pub fn capabilities(self) -> &'static [Capability] {
        match self {
            Role::Owner => &[
                Capability::AuthorPosts,
                Capability::ManageSubscriptions,
                Capability::ManageMembers,
            ],
            Role::Member => &[],
        }
    }

    pub fn can(self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Member => "member",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Role::Owner),
            "member" => Ok(Role::Member),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Inactive,
}

impl SubscriptionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Inactive => "inactive",
        }
    }
}

impl FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SubscriptionStatus::Active),
            "inactive" => Ok(SubscriptionStatus::Inactive),
            other => Err(format!("unknown subscription status '{}'", other)),
        }
    }
}

/// A club member or owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
    pub role: Role,
    pub subscription_status: SubscriptionStatus,
    pub subscription_expires_at: Option<DateTime<Utc>>,

    /// Device push token. Never sent back to clients.
    #[serde(skip)]
    pub push_token: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl User {
    /// A brand new member as created by the first login: no subscription until an owner activates one.
    pub fn new_member(email: &str, name: &str, picture: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: format!("user_{}", short_id()),
            email: email.to_string(),
            name: name.to_string(),
            picture,
            role: Role::Member,
            subscription_status: SubscriptionStatus::Inactive,
            subscription_expires_at: None,
            push_token: None,
            created_at: now,
        }
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.role.can(capability)
    }

    /// Active status and not past its expiry (a missing expiry never lapses).
    pub fn has_current_subscription(&self, now: DateTime<Utc>) -> bool {
        self.subscription_status == SubscriptionStatus::Active
            && self.subscription_expires_at.is_none_or(|expiry| expiry > now)
    }
}

/// Twelve hex characters, the id suffix used for users, posts, sessions and attempts.
pub fn short_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..12].to_string()
}

/// Subscription summary for the current user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionResponse {
    pub status: SubscriptionStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    /// Whole days left, rounded up. Only present while the subscription is current.
    pub days_remaining: Option<i64>,
}

impl SubscriptionResponse {
    pub fn for_user(user: &User, now: DateTime<Utc>) -> Self {
        let is_active = user.has_current_subscription(now);
        let days_remaining = match (is_active, user.subscription_expires_at) {
            (true, Some(expiry)) => {
                let seconds = (expiry - now).num_seconds();
                Some((seconds + 86_399) / 86_400)
            }
            _ => None,
        };

        Self {
            status: user.subscription_status,
            expires_at: user.subscription_expires_at,
            is_active,
            days_remaining,
        }
    }
}

/// Owner actions on a member's subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionAction {
    Activate,
    Extend,
    Deactivate,
}

impl FromStr for SubscriptionAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "activate" => Ok(SubscriptionAction::Activate),
            "extend" => Ok(SubscriptionAction::Extend),
            "deactivate" => Ok(SubscriptionAction::Deactivate),
            other => Err(format!("Invalid action '{}'", other)),
        }
    }
}

impl SubscriptionAction {
    /// New (status, expiry) for a member.
    ///
    /// Extending a lapsed subscription counts from `now`, otherwise from the current expiry.
    pub fn apply(
        self,
        user: &User,
        months: u32,
        now: DateTime<Utc>,
    ) -> (SubscriptionStatus, Option<DateTime<Utc>>) {
        let period = chrono::Duration::days(SUBSCRIPTION_PERIOD_DAYS * i64::from(months));
        match self {
            SubscriptionAction::Activate => (SubscriptionStatus::Active, Some(now + period)),
            SubscriptionAction::Extend => {
                let base = match user.subscription_expires_at {
                    Some(expiry) if expiry > now => expiry,
                    _ => now,
                };
                (SubscriptionStatus::Active, Some(base + period))
            }
            SubscriptionAction::Deactivate => {
                (SubscriptionStatus::Inactive, user.subscription_expires_at)
            }
        }
    }
}

/// Query parameters for the subscription admin endpoint.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SubscriptionActionParams {
    /// 'activate', 'extend' or 'deactivate'.
    pub action: String,
    /// Number of 30-day periods (default 1).
    pub months: Option<u32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PushTokenRequest {
    pub push_token: String,
}
