// src/routes.rs

use axum::{
    Router,
    http::{HeaderName, Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    docs,
    handlers::{admin, auth, club, community, puzzle, subscription},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Public: health, club info, OpenAPI document, session exchange and logout.
/// * Everything else sits behind the bearer auth middleware.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-session-id"),
        ]);

    let public_routes = Router::new()
        .route("/", get(club::health))
        .route("/api/club-info", get(club::club_info))
        .route("/api/openapi.json", get(docs::openapi_json))
        .route("/api/auth/session", post(auth::create_session))
        .route("/api/auth/logout", post(auth::logout));

    let protected_routes = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/push-token", post(auth::save_push_token))
        .route(
            "/api/posts",
            get(community::list_posts).post(community::create_post),
        )
        .route("/api/feed", get(community::get_feed))
        .route("/api/puzzles/submit", post(puzzle::submit_attempt))
        .route("/api/puzzles/{post_id}/status", get(puzzle::get_status))
        .route("/api/subscription", get(subscription::get_subscription))
        .route("/api/admin/members", get(admin::list_members))
        .route(
            "/api/admin/members/{user_id}/subscription",
            post(admin::update_member_subscription),
        )
        .route("/api/admin/make-owner/{email}", post(admin::make_owner))
        // route_layer: unknown paths stay 404 instead of 401
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
