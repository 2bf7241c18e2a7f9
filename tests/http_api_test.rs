use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use rendezveux::config::Config;
use rendezveux::db;
use rendezveux::routes;
use rendezveux::state::AppState;

fn test_app() -> (Router, AppState, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let pool = db::create_pool(&temp_dir.path().join("test.db")).unwrap();
    db::run_migrations(&pool).unwrap();

    let state = AppState::new(pool, Config::default());
    (routes::app(state.clone()), state, temp_dir)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}

async fn onboard(app: &Router, account_id: &str, username: &str) -> String {
    let (status, user) = send(
        app,
        Method::PUT,
        &format!("/api/users/{}", account_id),
        Some(json!({ "username": username, "name": username })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "onboarding failed: {}", user);
    user["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let (app, _state, _tmp) = test_app();
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".to_string()));
}

#[tokio::test]
async fn test_post_thread_over_http() {
    let (app, state, _tmp) = test_app();
    let alice = onboard(&app, "acct_alice", "alice").await;
    let bob = onboard(&app, "acct_bob", "bob").await;

    let (status, post) = send(
        &app,
        Method::POST,
        "/api/posts",
        Some(json!({ "text": "hello", "author_id": alice, "path": "/" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(post["text"], "hello");
    assert!(post["community"].is_null());
    let post_id = post["id"].as_str().unwrap().to_string();

    let (status, comment) = send(
        &app,
        Method::POST,
        &format!("/api/posts/{}/comments", post_id),
        Some(json!({ "text": "hi alice", "user_id": bob })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(comment["parent_id"], post_id.as_str());
    assert!(state
        .revalidator
        .last_revalidated(&format!("/rendezveux/{}", post_id))
        .is_some());

    let (status, thread) = send(&app, Method::GET, &format!("/api/posts/{}", post_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(thread["children"][0]["author"]["username"], "bob");

    let (status, feed) = send(&app, Method::GET, "/api/posts?page=1&size=10", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feed["posts"].as_array().unwrap().len(), 1);
    assert_eq!(feed["is_next"], false);

    let (status, deleted) = send(
        &app,
        Method::DELETE,
        &format!("/api/posts/{}?path=/", post_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["post_ids"].as_array().unwrap().len(), 2);

    let (status, _) = send(&app, Method::GET, &format!("/api/posts/{}", post_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/posts/{}", post_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_short_text_is_rejected() {
    let (app, _state, _tmp) = test_app();
    let alice = onboard(&app, "acct_alice", "alice").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/posts",
        Some(json!({ "text": " hi ", "author_id": alice })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.as_str().unwrap().contains("Minimum 3 characters"));
}

#[tokio::test]
async fn test_unknown_author_is_internal_error() {
    let (app, _state, _tmp) = test_app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/posts",
        Some(json!({ "text": "hello there", "author_id": "ghost" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, Value::String("Internal server error".to_string()));
}

#[tokio::test]
async fn test_community_profile_over_http() {
    let (app, _state, _tmp) = test_app();
    let alice = onboard(&app, "acct_alice", "alice").await;

    let (status, community) = send(
        &app,
        Method::POST,
        "/api/communities",
        Some(json!({
            "account_id": "org_books",
            "username": "books",
            "name": "Books",
            "created_by": "acct_alice"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(community["username"], "books");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/posts",
        Some(json!({ "text": "book club tonight", "author_id": alice, "community_id": "org_books" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, profile) = send(&app, Method::GET, "/api/communities/org_books/posts", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["owner"]["name"], "Books");
    assert_eq!(profile["posts"][0]["community"]["account_id"], "org_books");

    let (status, profile) = send(&app, Method::GET, "/api/users/acct_alice/posts", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["posts"].as_array().unwrap().len(), 1);

    let (status, _) = send(&app, Method::GET, "/api/users/acct_nobody", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_username_conflicts() {
    let (app, _state, _tmp) = test_app();
    onboard(&app, "acct_alice", "alice").await;

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/users/acct_other",
        Some(json!({ "username": "alice", "name": "Other" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}
