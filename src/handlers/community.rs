// src/handlers/community.rs

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use crate::{
    config::POST_LIST_LIMIT,
    error::AppError,
    feed::{ActivePuzzle, FeedResponse, compose_feed},
    models::{
        post::{CreatePostRequest, PostListParams, PublicPost},
        session::AuthContext,
        user::Capability,
    },
    notify::announce_puzzle,
    state::AppState,
};

/// List posts (Recent first), puzzles included.
#[utoipa::path(
    get,
    path = "/api/posts",
    params(PostListParams),
    responses(
        (status = 200, description = "Posts, newest first", body = [PublicPost]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Subscription required")
    ),
    tag = "posts"
)]
pub async fn list_posts(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<PostListParams>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_subscription(state.config.require_active_subscription, Utc::now())?;

    let limit = params.limit.unwrap_or(POST_LIST_LIMIT).clamp(1, POST_LIST_LIMIT);
    let posts = state.store.list_posts(limit).await?;

    Ok(Json(
        posts.iter().map(PublicPost::from).collect::<Vec<_>>(),
    ))
}

/// Create a new post or puzzle.
/// Requires: the `AuthorPosts` capability (owners).
///
/// A new puzzle becomes the active puzzle and is announced to active members.
#[utoipa::path(
    post,
    path = "/api/posts",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Post created", body = PublicPost),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Caller cannot author posts")
    ),
    tag = "posts"
)]
pub async fn create_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require(Capability::AuthorPosts)?;
    payload.check()?;

    let post = payload.into_post(&auth.user.user_id, Utc::now())?;
    state.store.insert_post(post.clone()).await?;

    tracing::info!(
        "User {} created post {} (puzzle: {})",
        auth.user.user_id,
        post.post_id,
        post.is_puzzle()
    );

    let body = PublicPost::from(&post);
    if post.is_puzzle() {
        announce_puzzle(state.store.clone(), state.notifier.clone(), post);
    }

    Ok((StatusCode::CREATED, Json(body)))
}

/// The member feed: the most recent puzzle with the caller's status, plus
/// non-puzzle posts newest first.
#[utoipa::path(
    get,
    path = "/api/feed",
    responses(
        (status = 200, description = "Feed", body = FeedResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Subscription required")
    ),
    tag = "posts"
)]
pub async fn get_feed(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_subscription(state.config.require_active_subscription, Utc::now())?;

    let mut feed = compose_feed(state.store.list_posts(POST_LIST_LIMIT).await?);

    // The listing window can miss an old puzzle that is still the latest one.
    if feed.active_puzzle.is_none() {
        feed.active_puzzle = state.store.latest_puzzle().await?;
    }

    let active_puzzle = match feed.active_puzzle {
        Some(post) => {
            let status = state
                .tracker
                .state_of(&auth.user.user_id, &post.post_id)
                .await?;
            Some(ActivePuzzle {
                post: PublicPost::from(&post),
                status,
            })
        }
        None => None,
    };

    Ok(Json(FeedResponse {
        active_puzzle,
        posts: feed.posts.iter().map(PublicPost::from).collect(),
    }))
}
