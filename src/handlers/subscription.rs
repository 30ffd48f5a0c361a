// src/handlers/subscription.rs

use axum::{Extension, Json};
use chrono::Utc;

use crate::models::{session::AuthContext, user::SubscriptionResponse};

/// Subscription summary of the current user.
#[utoipa::path(
    get,
    path = "/api/subscription",
    responses(
        (status = 200, description = "Subscription summary", body = SubscriptionResponse),
        (status = 401, description = "Not authenticated")
    ),
    tag = "subscription"
)]
pub async fn get_subscription(Extension(auth): Extension<AuthContext>) -> Json<SubscriptionResponse> {
    Json(SubscriptionResponse::for_user(&auth.user, Utc::now()))
}
