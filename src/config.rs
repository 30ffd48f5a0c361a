// src/config.rs

use std::{env, fmt, net::SocketAddr};

use dotenvy::dotenv;
use url::Url;

use crate::{models::club::ClubInfo, tracker::AnswerMatch};

/// Accepted submissions allowed per (user, puzzle).
pub const MAX_PUZZLE_ATTEMPTS: u32 = 2;

pub const DEFAULT_SESSION_TTL_DAYS: i64 = 7;

/// Length of one subscription "month".
pub const SUBSCRIPTION_PERIOD_DAYS: i64 = 30;

pub const MAX_SUBSCRIPTION_MONTHS: u32 = 24;

/// Upper bound for post listings.
pub const POST_LIST_LIMIT: i64 = 100;

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str, String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(var) => write!(f, "{} must be set", var),
            ConfigError::Invalid(var, reason) => write!(f, "{} is invalid: {}", var, reason),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub rust_log: String,
    pub bind_address: SocketAddr,
    pub session_ttl_days: i64,

    /// Endpoint that turns an identity redirect `session_id` into a profile.
    pub identity_url: Url,
    /// Push gateway. Notifications are only logged when unset.
    pub push_url: Option<Url>,
    /// Promoted to owner at startup and on login.
    pub owner_email: Option<String>,

    pub club: ClubInfo,
    pub require_active_subscription: bool,
    pub answer_match: AnswerMatch,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let bind_address = env::var("BIND_ADDRESS")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid("BIND_ADDRESS", e.to_string()))?;

        let session_ttl_days = match env::var("SESSION_TTL_DAYS") {
            Ok(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|days| *days > 0)
                .ok_or_else(|| ConfigError::Invalid("SESSION_TTL_DAYS", raw))?,
            Err(_) => DEFAULT_SESSION_TTL_DAYS,
        };

        let identity_url = parse_url("IDENTITY_URL", &required("IDENTITY_URL")?)?;
        let push_url = match env::var("PUSH_URL") {
            Ok(raw) if !raw.trim().is_empty() => Some(parse_url("PUSH_URL", &raw)?),
            _ => None,
        };

        let owner_email = env::var("OWNER_EMAIL")
            .ok()
            .map(|email| email.trim().to_lowercase())
            .filter(|email| !email.is_empty());

        let club = ClubInfo {
            name: env::var("CLUB_NAME").unwrap_or_else(|_| "Chess Club".to_string()),
            is_open: flag("CLUB_IS_OPEN", true)?,
            timings: env::var("CLUB_TIMINGS").unwrap_or_default(),
        };

        let require_active_subscription = flag("REQUIRE_ACTIVE_SUBSCRIPTION", false)?;
        let answer_match = if flag("PUZZLE_CASE_INSENSITIVE", false)? {
            AnswerMatch::CaseInsensitive
        } else {
            AnswerMatch::Exact
        };

        Ok(Self {
            database_url,
            jwt_secret,
            rust_log,
            bind_address,
            session_ttl_days,
            identity_url,
            push_url,
            owner_email,
            club,
            require_active_subscription,
            answer_match,
        })
    }
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    env::var(var).map_err(|_| ConfigError::Missing(var))
}

fn parse_url(var: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::Invalid(var, e.to_string()))
}

fn flag(var: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(var) {
        Ok(raw) => parse_flag(&raw).ok_or(ConfigError::Invalid(var, raw)),
        Err(_) => Ok(default),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
