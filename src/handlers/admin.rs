// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;

use crate::{
    config::MAX_SUBSCRIPTION_MONTHS,
    error::AppError,
    models::{
        session::AuthContext,
        user::{Capability, Role, SubscriptionAction, SubscriptionActionParams, User},
    },
    state::AppState,
};

/// Lists all users in the club.
/// Owner only.
#[utoipa::path(
    get,
    path = "/api/admin/members",
    responses(
        (status = 200, description = "All users, newest first", body = [User]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an owner")
    ),
    tag = "admin"
)]
pub async fn list_members(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<impl IntoResponse, AppError> {
    auth.require(Capability::ManageSubscriptions)?;

    let users = state.store.list_users().await?;
    Ok(Json(users))
}

/// Activates, extends or deactivates a member's subscription.
/// Owner only.
#[utoipa::path(
    post,
    path = "/api/admin/members/{user_id}/subscription",
    params(
        ("user_id" = String, Path, description = "Member id"),
        SubscriptionActionParams
    ),
    responses(
        (status = 200, description = "Subscription updated"),
        (status = 400, description = "Unknown action or months out of range"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an owner"),
        (status = 404, description = "Member not found")
    ),
    tag = "admin"
)]
pub async fn update_member_subscription(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(user_id): Path<String>,
    Query(params): Query<SubscriptionActionParams>,
) -> Result<impl IntoResponse, AppError> {
    auth.require(Capability::ManageSubscriptions)?;

    let action = params
        .action
        .parse::<SubscriptionAction>()
        .map_err(AppError::BadRequest)?;

    let months = params.months.unwrap_or(1);
    if !(1..=MAX_SUBSCRIPTION_MONTHS).contains(&months) {
        return Err(AppError::BadRequest(format!(
            "Months must be between 1 and {}",
            MAX_SUBSCRIPTION_MONTHS
        )));
    }

    let member = state
        .store
        .get_user(&user_id)
        .await?
        .ok_or(AppError::NotFound("Member not found".to_string()))?;

    let (status, expires_at) = action.apply(&member, months, Utc::now());

    let member = state
        .store
        .update_subscription(&user_id, status, expires_at)
        .await?
        .ok_or(AppError::NotFound("Member not found".to_string()))?;

    tracing::info!(
        "User {} applied {:?} ({} months) to {}",
        auth.user.user_id,
        action,
        months,
        user_id
    );

    Ok(Json(json!({
        "message": "Subscription updated successfully",
        "action": params.action,
        "member": member
    })))
}

/// Grants the owner role to the user with `email`.
/// Owner only.
#[utoipa::path(
    post,
    path = "/api/admin/make-owner/{email}",
    params(("email" = String, Path, description = "Email of an existing user")),
    responses(
        (status = 200, description = "Role updated"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an owner"),
        (status = 404, description = "User not found")
    ),
    tag = "admin"
)]
pub async fn make_owner(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(email): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    auth.require(Capability::ManageMembers)?;

    let user = state
        .store
        .set_role_by_email(email.trim(), Role::Owner)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    tracing::info!("User {} promoted {} to owner", auth.user.user_id, user.user_id);

    Ok(Json(json!({
        "message": format!("User {} is now an owner", user.email),
        "user": user
    })))
}
