// src/docs.rs

use axum::Json;
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::{
    feed::{ActivePuzzle, FeedResponse},
    handlers::{admin, auth, club, community, puzzle, subscription},
    models::{
        club::ClubInfo,
        post::{CreatePostRequest, PublicPost},
        puzzle::{AttemptKind, AttemptResponse, PuzzleAttemptState, SubmitAttemptRequest},
        session::SessionResponse,
        user::{PushTokenRequest, Role, SubscriptionResponse, SubscriptionStatus, User},
    },
};

#[derive(OpenApi)]
#[openapi(
    info(title = "Chess Club API", description = "Members, posts and daily puzzles"),
    paths(
        club::health,
        club::club_info,
        auth::create_session,
        auth::me,
        auth::logout,
        auth::save_push_token,
        community::list_posts,
        community::create_post,
        community::get_feed,
        puzzle::submit_attempt,
        puzzle::get_status,
        subscription::get_subscription,
        admin::list_members,
        admin::update_member_subscription,
        admin::make_owner,
    ),
    components(schemas(
        ClubInfo,
        User,
        Role,
        SubscriptionStatus,
        SubscriptionResponse,
        SessionResponse,
        PushTokenRequest,
        PublicPost,
        CreatePostRequest,
        FeedResponse,
        ActivePuzzle,
        PuzzleAttemptState,
        SubmitAttemptRequest,
        AttemptKind,
        AttemptResponse,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Sign-in and sessions"),
        (name = "posts", description = "Club posts and the feed"),
        (name = "puzzles", description = "Puzzle attempts"),
        (name = "subscription", description = "Membership status"),
        (name = "admin", description = "Owner tools"),
        (name = "club", description = "Public club details")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Serves the generated OpenAPI document.
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
