// tests/puzzle_tests.rs

use std::sync::Arc;

use async_trait::async_trait;
use chess_club::{
    client::{ClientError, ClubClient},
    config::Config,
    error::AppError,
    identity::{IdentityProfile, IdentityProvider},
    models::{club::ClubInfo, post::CreatePostRequest, puzzle::AttemptKind},
    notify::LogNotifier,
    routes,
    state::AppState,
    store::MemoryStore,
    tracker::AnswerMatch,
};
use url::Url;

struct StubIdentity;

#[async_trait]
impl IdentityProvider for StubIdentity {
    async fn exchange(&self, session_id: &str) -> Result<IdentityProfile, AppError> {
        Ok(IdentityProfile {
            email: format!("{}@example.com", session_id),
            name: session_id.to_string(),
            picture: None,
        })
    }
}

async fn spawn_app_with(answer_match: AnswerMatch) -> String {
    let config = Config {
        database_url: "postgres://unused".to_string(),
        jwt_secret: "puzzle_test_secret".to_string(),
        rust_log: "error".to_string(),
        bind_address: "127.0.0.1:0".parse().unwrap(),
        session_ttl_days: 7,
        identity_url: Url::parse("http://127.0.0.1:1/identity").unwrap(),
        push_url: None,
        owner_email: Some("owner@example.com".to_string()),
        club: ClubInfo {
            name: "Test Chess Club".to_string(),
            is_open: true,
            timings: String::new(),
        },
        require_active_subscription: false,
        answer_match,
    };

    let state = AppState::new(
        Arc::new(MemoryStore::new()),
        Arc::new(StubIdentity),
        Arc::new(LogNotifier),
        config,
    );
    let app = routes::create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

async fn spawn_app() -> String {
    spawn_app_with(AnswerMatch::Exact).await
}

fn puzzle_request(answer: &str, failure_message: Option<&str>) -> CreatePostRequest {
    CreatePostRequest {
        title: "Daily puzzle".to_string(),
        content: "White to move".to_string(),
        image: None,
        is_puzzle: true,
        puzzle_answer: Some(answer.to_string()),
        success_message: Some("Brilliant!".to_string()),
        failure_message: failure_message.map(str::to_string),
    }
}

/// Owner publishes a puzzle; returns (member token, post id).
async fn setup_puzzle(address: &str, failure_message: Option<&str>) -> (String, String) {
    let api = ClubClient::new(address);
    let owner = api.login("owner").await.expect("owner login");
    let post = api
        .create_post(&owner, &puzzle_request("Nf3", failure_message))
        .await
        .expect("create puzzle");
    let member = api.login("member").await.expect("member login");
    (member.token, post.post_id)
}

async fn submit(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    post_id: &str,
    answer: &str,
) -> reqwest::Response {
    client
        .post(&format!("{}/api/puzzles/submit", address))
        .bearer_auth(token)
        .json(&serde_json::json!({ "post_id": post_id, "answer": answer }))
        .send()
        .await
        .expect("Submit failed")
}

async fn status(client: &reqwest::Client, address: &str, token: &str, post_id: &str) -> serde_json::Value {
    client
        .get(&format!("{}/api/puzzles/{}/status", address, post_id))
        .bearer_auth(token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn untouched_puzzle_reports_zero_state() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (token, post_id) = setup_puzzle(&address, None).await;

    let state = status(&client, &address, &token, &post_id).await;

    assert_eq!(state["attempts_used"], 0);
    assert_eq!(state["attempts_remaining"], 2);
    assert_eq!(state["has_solved"], false);
}

#[tokio::test]
async fn trimmed_correct_answer_solves_and_locks() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (token, post_id) = setup_puzzle(&address, None).await;

    // Act
    let solved: serde_json::Value = submit(&client, &address, &token, &post_id, "  Nf3 ")
        .await
        .json()
        .await
        .unwrap();

    // Assert
    assert_eq!(solved["accepted"], true);
    assert_eq!(solved["is_correct"], true);
    assert_eq!(solved["outcome"], "correct");
    assert_eq!(solved["message"], "Brilliant!");
    assert_eq!(solved["attempts_used"], 1);
    assert_eq!(solved["has_solved"], true);

    let again: serde_json::Value = submit(&client, &address, &token, &post_id, "Nf3")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(again["accepted"], false);
    assert_eq!(again["outcome"], "already_solved");
    assert_eq!(again["attempts_used"], 1);

    let state = status(&client, &address, &token, &post_id).await;
    assert_eq!(state["attempts_used"], 1);
    assert_eq!(state["has_solved"], true);
}

#[tokio::test]
async fn two_wrong_answers_exhaust_the_puzzle() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (token, post_id) = setup_puzzle(&address, Some("The answer was Nf3.")).await;

    // Act: answers are case-sensitive by default
    let first: serde_json::Value = submit(&client, &address, &token, &post_id, "nf3")
        .await
        .json()
        .await
        .unwrap();
    let second: serde_json::Value = submit(&client, &address, &token, &post_id, "e4")
        .await
        .json()
        .await
        .unwrap();
    let third: serde_json::Value = submit(&client, &address, &token, &post_id, "Nf3")
        .await
        .json()
        .await
        .unwrap();

    // Assert
    assert_eq!(first["accepted"], true);
    assert_eq!(first["is_correct"], false);
    assert_eq!(first["message"], "Incorrect. You have 1 attempt(s) remaining.");
    assert_eq!(first["attempts_remaining"], 1);

    assert_eq!(second["accepted"], true);
    assert_eq!(second["message"], "The answer was Nf3.");
    assert_eq!(second["attempts_remaining"], 0);

    assert_eq!(third["accepted"], false);
    assert_eq!(third["is_correct"], false);
    assert_eq!(third["outcome"], "exhausted");
    assert_eq!(third["message"], "The answer was Nf3.");
    assert_eq!(third["attempts_used"], 2);

    let state = status(&client, &address, &token, &post_id).await;
    assert_eq!(state["attempts_used"], 2);
    assert_eq!(state["has_solved"], false);
}

#[tokio::test]
async fn case_insensitive_matching_is_configurable() {
    let address = spawn_app_with(AnswerMatch::CaseInsensitive).await;
    let client = reqwest::Client::new();
    let (token, post_id) = setup_puzzle(&address, None).await;

    let result: serde_json::Value = submit(&client, &address, &token, &post_id, "nf3")
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(result["is_correct"], true);
}

#[tokio::test]
async fn invalid_submissions_are_not_counted() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (token, post_id) = setup_puzzle(&address, None).await;

    let blank = submit(&client, &address, &token, &post_id, "   ").await;
    assert_eq!(blank.status().as_u16(), 400);

    let unknown = submit(&client, &address, &token, "post_missing", "Nf3").await;
    assert_eq!(unknown.status().as_u16(), 404);

    let state = status(&client, &address, &token, &post_id).await;
    assert_eq!(state["attempts_used"], 0);
}

#[tokio::test]
async fn plain_post_is_not_a_puzzle() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let api = ClubClient::new(&address);
    let owner = api.login("owner").await.unwrap();

    let mut request = puzzle_request("Nf3", None);
    request.is_puzzle = false;
    let post = api.create_post(&owner, &request).await.unwrap();

    let response = submit(&client, &address, &owner.token, &post.post_id, "Nf3").await;
    assert_eq!(response.status().as_u16(), 400);

    let status = client
        .get(&format!("{}/api/puzzles/{}/status", address, post.post_id))
        .bearer_auth(&owner.token)
        .send()
        .await
        .unwrap();
    assert_eq!(status.status().as_u16(), 400);
}

#[tokio::test]
async fn concurrent_submissions_never_exceed_the_cap() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (token, post_id) = setup_puzzle(&address, None).await;

    // Act
    let mut handles = Vec::new();
    for i in 0..8 {
        let client = client.clone();
        let address = address.clone();
        let token = token.clone();
        let post_id = post_id.clone();
        handles.push(tokio::spawn(async move {
            submit(&client, &address, &token, &post_id, &format!("wrong{}", i))
                .await
                .json::<serde_json::Value>()
                .await
                .unwrap()
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        if handle.await.unwrap()["accepted"] == true {
            accepted += 1;
        }
    }

    // Assert
    assert_eq!(accepted, 2);
    let state = status(&client, &address, &token, &post_id).await;
    assert_eq!(state["attempts_used"], 2);
}

#[tokio::test]
async fn client_session_round_trip() {
    // Arrange
    let address = spawn_app().await;
    let api = ClubClient::new(&address);
    let (_, post_id) = setup_puzzle(&address, None).await;
    let mut session = Some(api.login("member").await.expect("login"));

    // Act
    let current = session.as_ref().unwrap();
    let feed = api.feed(current).await.expect("feed");
    let active = feed.active_puzzle.expect("active puzzle");
    assert_eq!(active.post.post_id, post_id);
    assert_eq!(active.status.attempts_used, 0);

    let blank = api.submit_attempt(current, &post_id, "  ").await;
    assert!(matches!(blank, Err(ClientError::Validation(_))));

    let result = api
        .submit_attempt(current, &post_id, "Nf3")
        .await
        .expect("submit");
    assert_eq!(result.outcome, AttemptKind::Correct);

    let refreshed = api.refresh_status(current, &post_id, active.status).await;
    assert!(refreshed.has_solved);

    let subscription = api.subscription(current).await.expect("subscription");
    assert!(!subscription.is_active);

    // Assert: logout clears the context and the old token stops working
    let stale = session.clone().unwrap();
    api.logout(&mut session).await;
    assert!(session.is_none());
    assert!(matches!(api.me(&stale).await, Err(ClientError::Unauthorized(_))));

    // A failed read keeps the last known state
    let kept = api.refresh_status(&stale, &post_id, refreshed).await;
    assert_eq!(kept, refreshed);
}

#[tokio::test]
async fn member_client_gets_forbidden_on_authoring() {
    let address = spawn_app().await;
    let api = ClubClient::new(&address);
    let member = api.login("member").await.unwrap();

    let result = api.create_post(&member, &puzzle_request("Nf3", None)).await;

    assert!(matches!(result, Err(ClientError::Forbidden(_))));
}

#[tokio::test]
async fn ampersands_and_angle_brackets_reach_members_verbatim() {
    // Arrange
    let address = spawn_app().await;
    let api = ClubClient::new(&address);
    let owner = api.login("owner").await.unwrap();

    let mut request = puzzle_request("Nf3", Some("Nf3 < Qxf7+ here"));
    request.title = "Rook & Knight vs Queen".to_string();
    request.success_message = Some("Bishop & pawn win!".to_string());
    let created = api.create_post(&owner, &request).await.unwrap();
    assert_eq!(created.title, "Rook & Knight vs Queen");

    let member = api.login("member").await.unwrap();

    // Act
    let feed = api.feed(&member).await.unwrap();
    let result = api
        .submit_attempt(&member, &created.post_id, "Nf3")
        .await
        .unwrap();

    // Assert
    assert_eq!(
        feed.active_puzzle.unwrap().post.title,
        "Rook & Knight vs Queen"
    );
    assert_eq!(result.message, "Bishop & pawn win!");

    let other = api.login("other").await.unwrap();
    api.submit_attempt(&other, &created.post_id, "e4").await.unwrap();
    let exhausted = api
        .submit_attempt(&other, &created.post_id, "d4")
        .await
        .unwrap();
    assert_eq!(exhausted.message, "Nf3 < Qxf7+ here");
}
