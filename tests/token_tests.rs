//! Tests for the token endpoints.
//!
//! Tests cover:
//! - Obtaining an access/refresh pair with a password
//! - Refreshing, verifying and blacklisting
//! - Rejection bodies carry the `token_not_valid` code

mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn test_obtain_token_pair() {
    let t = TestApp::new().await;
    t.register("alice", "correct-horse").await;

    let (access, refresh) = t.login("alice", "correct-horse").await;

    let claims = t.jwt.validate_access_token(&access).unwrap();
    assert_eq!(claims.username, "alice");
    let refresh_claims = t.jwt.validate_refresh_token(&refresh).unwrap();
    assert!(
        t.db.tokens()
            .get_by_jti(&refresh_claims.jti)
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn test_obtain_token_bad_credentials() {
    let t = TestApp::new().await;
    t.register("alice", "correct-horse").await;

    let (status, body) = t
        .post(
            "/api/token",
            None,
            json!({ "username": "alice", "password": "wrong-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body["detail"],
        "No active account found with the given credentials"
    );

    let (status, _) = t
        .post(
            "/api/token",
            None,
            json!({ "username": "nobody", "password": "correct-horse" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_obtain_token_missing_fields() {
    let t = TestApp::new().await;

    let (status, body) = t.post("/api/token", None, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["username"].is_array());
    assert!(body["password"].is_array());
}

#[tokio::test]
async fn test_refresh_issues_new_access_token() {
    let t = TestApp::new().await;
    t.register("alice", "correct-horse").await;
    let (_, refresh) = t.login("alice", "correct-horse").await;

    let (status, body) = t
        .post("/api/token/refresh", None, json!({ "refresh": refresh }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let access = body["access"].as_str().unwrap();
    assert_eq!(t.jwt.validate_access_token(access).unwrap().username, "alice");
}

#[tokio::test]
async fn test_refresh_rejects_access_token() {
    let t = TestApp::new().await;
    let (_, access) = t.user("alice").await;

    let (status, body) = t
        .post("/api/token/refresh", None, json!({ "refresh": access }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "token_not_valid");
}

#[tokio::test]
async fn test_verify() {
    let t = TestApp::new().await;
    t.register("alice", "correct-horse").await;
    let (access, refresh) = t.login("alice", "correct-horse").await;

    let (status, body) = t
        .post("/api/token/verify", None, json!({ "token": access }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    let (status, _) = t
        .post("/api/token/verify", None, json!({ "token": refresh }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = t
        .post("/api/token/verify", None, json!({ "token": "not-a-jwt" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "token_not_valid");

    let (status, _) = t.post("/api/token/verify", None, json!({ "token": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_verify_rejects_foreign_signature() {
    let t = TestApp::new().await;
    let other = snapfeed::jwt::JwtConfig::new(b"some-other-secret-that-is-long-enough");
    let forged = other.generate_access_token(1, "alice").unwrap();

    let (status, _) = t
        .post("/api/token/verify", None, json!({ "token": forged.token }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_blacklist_round_trip() {
    let t = TestApp::new().await;
    t.register("alice", "correct-horse").await;
    let (_, refresh) = t.login("alice", "correct-horse").await;

    let (status, body) = t
        .post("/api/token/blacklist", None, json!({ "refresh": refresh }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    // Blacklisted refresh tokens can no longer be used or verified
    let (status, _) = t
        .post("/api/token/refresh", None, json!({ "refresh": refresh }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = t
        .post("/api/token/verify", None, json!({ "token": refresh }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = t
        .post("/api/token/blacklist", None, json!({ "refresh": refresh }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_blacklist_invalid_token() {
    let t = TestApp::new().await;

    let (status, body) = t
        .post("/api/token/blacklist", None, json!({ "refresh": "garbage" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "token_not_valid");
}

#[tokio::test]
async fn test_access_token_outlives_deleted_user_only_as_rejection() {
    let t = TestApp::new().await;
    let (id, access) = t.user("alice").await;
    t.db.users().delete(id).await.unwrap();

    let (status, body) = t
        .post("/api/posts", Some(&access), json!({ "caption": "hi" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "token_not_valid");
}
