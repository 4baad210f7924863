// SPDX-License-Identifier: MIT

//! Account endpoint tests: registration, login, and the public/protected
//! split of the router.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;

async fn post_json(app: axum::Router, uri: &str, body: Value) -> axum::response::Response {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_register_creates_user() {
    let (app, _state) = common::create_test_app();

    let response = post_json(
        app,
        "/auth/register",
        json!({ "email": "alice@example.com", "password": "secret1", "name": "Alice" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["user"]["email"], "alice@example.com");
    assert_eq!(body["user"]["role"], "USER");
    // The summary never carries password material.
    assert!(body["user"].get("passwordHash").is_none());
    assert!(body["user"].get("password").is_none());
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let (app, _state) = common::create_test_app();

    let payload = json!({ "email": "bob@example.com", "password": "secret1" });
    let first = post_json(app.clone(), "/auth/register", payload.clone()).await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = post_json(app, "/auth/register", payload).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(second).await["error"], "duplicate_email");
}

#[tokio::test]
async fn test_register_rejects_short_password() {
    let (app, _state) = common::create_test_app();

    let response = post_json(
        app,
        "/auth/register",
        json!({ "email": "carol@example.com", "password": "abc" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "validation_error");
}

#[tokio::test]
async fn test_register_rejects_invalid_email() {
    let (app, _state) = common::create_test_app();

    let response = post_json(
        app,
        "/auth/register",
        json!({ "email": "not-an-email", "password": "secret1" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_rejects_missing_fields() {
    let (app, _state) = common::create_test_app();

    let response = post_json(
        app,
        "/auth/register",
        json!({ "email": "dave@example.com" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "validation_error");
}

#[tokio::test]
async fn test_login_returns_token_pair_and_user() {
    let (app, _state) = common::create_test_app();

    post_json(
        app.clone(),
        "/auth/register",
        json!({ "email": "erin@example.com", "password": "secret1" }),
    )
    .await;

    let response = post_json(
        app,
        "/auth/login",
        json!({ "email": "erin@example.com", "password": "secret1" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(!body["accessToken"].as_str().unwrap().is_empty());
    assert!(!body["refreshToken"].as_str().unwrap().is_empty());
    assert_ne!(body["accessToken"], body["refreshToken"]);
    assert_eq!(body["user"]["email"], "erin@example.com");
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let (app, _state) = common::create_test_app();

    post_json(
        app.clone(),
        "/auth/register",
        json!({ "email": "frank@example.com", "password": "secret1" }),
    )
    .await;

    // Wrong password for a known account.
    let wrong_password = post_json(
        app.clone(),
        "/auth/login",
        json!({ "email": "frank@example.com", "password": "wrong-pw" }),
    )
    .await;
    // Unknown account entirely.
    let unknown_email = post_json(
        app,
        "/auth/login",
        json!({ "email": "nobody@example.com", "password": "wrong-pw" }),
    )
    .await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
    // Same body either way, so login cannot enumerate accounts.
    assert_eq!(
        body_json(wrong_password).await,
        body_json(unknown_email).await
    );
}

#[tokio::test]
async fn test_health_is_public() {
    let (app, _state) = common::create_test_app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let (app, _state) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/users/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
