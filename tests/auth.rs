//! Authentication Tests
//!
//! Covers registration validation, login, token resolution and the
//! blocked-account gate.

mod common;

use axum::http::StatusCode;
use common::{app, offline, unique, DEFAULT_PASSWORD};
use serde_json::json;

// ===========================================================================
// Router-only
// ===========================================================================

#[tokio::test]
async fn me_without_token_is_unauthorized() {
    let app = offline();
    let resp = app.get("/auth/me", None).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.error_message(), "missing authorization token");
}

#[tokio::test]
async fn unknown_token_is_unauthorized() {
    let app = offline();
    let resp = app.get("/auth/me", Some("not-a-real-token")).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.error_message(), "invalid token");
}

#[tokio::test]
async fn register_requires_all_fields() {
    let app = offline();
    let resp = app
        .post_json(
            "/auth/register",
            json!({ "username": "someone", "email": "", "password": "pw" }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_rejects_short_username() {
    let app = offline();
    let resp = app
        .post_json(
            "/auth/register",
            json!({ "username": " ab ", "email": "ab@example.com", "password": "pw" }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "username must be at least 3 characters");
}

#[tokio::test]
async fn login_requires_email_and_password() {
    let app = offline();
    let resp = app
        .post_json("/auth/login", json!({ "email": "a@example.com" }), None)
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn token_issued_in_store_resolves() {
    let app = offline();
    let token = app.state.tokens.issue(42);

    // Logout never touches the database.
    let resp = app.post_json("/auth/logout", json!({}), Some(&token)).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["ok"], true);
    assert_eq!(app.state.tokens.resolve(&token), None);
}

// ===========================================================================
// Database-backed
// ===========================================================================

#[tokio::test]
async fn register_then_me() {
    let Some(app) = app().await else { return };
    let user = app.register("reg").await;

    let resp = app.get("/auth/me", Some(&user.token)).await;
    assert_eq!(resp.status, StatusCode::OK);
    let me = &resp.json()["user"];
    assert_eq!(me["id"], user.id);
    assert_eq!(me["username"], user.username.as_str());
    assert_eq!(me["display_name"], user.username.as_str());
    assert_eq!(me["email"], user.email.as_str());
}

#[tokio::test]
async fn register_normalizes_identity() {
    let Some(app) = app().await else { return };
    let username = unique("MixedCase");

    let resp = app
        .post_json(
            "/auth/register",
            json!({
                "username": format!("  {}  ", username),
                "email": format!("{}@Example.COM", username),
                "password": DEFAULT_PASSWORD,
            }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let token = resp.json()["token"].as_str().unwrap().to_string();

    let me = app.get("/auth/me", Some(&token)).await.json();
    assert_eq!(me["user"]["username"], username.to_lowercase().as_str());
    assert_eq!(
        me["user"]["email"],
        format!("{}@example.com", username.to_lowercase()).as_str()
    );
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let Some(app) = app().await else { return };
    let user = app.register("dup").await;

    let resp = app
        .post_json(
            "/auth/register",
            json!({ "username": user.username, "email": "other@example.com", "password": DEFAULT_PASSWORD }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = app
        .post_json(
            "/auth/register",
            json!({ "username": unique("dup_other"), "email": user.email, "password": DEFAULT_PASSWORD }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_valid_and_invalid_credentials() {
    let Some(app) = app().await else { return };
    let user = app.register("login").await;

    let resp = app
        .post_json(
            "/auth/login",
            json!({ "email": user.email, "password": DEFAULT_PASSWORD }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["user_id"], user.id);
    assert!(body["token"].is_string());
    assert!(body.get("blocked").is_none());

    let resp = app
        .post_json(
            "/auth/login",
            json!({ "email": user.email, "password": "wrong_password" }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "invalid email or password");

    let resp = app
        .post_json(
            "/auth/login",
            json!({ "email": "nobody@example.com", "password": "whatever123" }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "invalid email or password");
}

#[tokio::test]
async fn legacy_sha256_password_still_logs_in() {
    let Some(app) = app().await else { return };
    let user = app.register("legacy").await;

    let legacy = {
        use sha2::{Digest, Sha256};
        hex::encode(Sha256::digest(b"old-password"))
    };
    sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
        .bind(&legacy)
        .bind(user.id)
        .execute(app.pool())
        .await
        .unwrap();

    let resp = app
        .post_json(
            "/auth/login",
            json!({ "email": user.email, "password": "old-password" }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
}

#[tokio::test]
async fn logout_revokes_token() {
    let Some(app) = app().await else { return };
    let user = app.register("logout").await;

    let resp = app.post_json("/auth/logout", json!({}), Some(&user.token)).await;
    assert_eq!(resp.status, StatusCode::OK);

    let resp = app.get("/auth/me", Some(&user.token)).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn x_authorization_header_is_accepted() {
    let Some(app) = app().await else { return };
    let user = app.register("xauth").await;

    let resp = app
        .request(
            axum::http::Method::GET,
            "/auth/me",
            None,
            &[("X-Authorization", user.token.as_str())],
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
}

#[tokio::test]
async fn blocked_account_can_login_but_not_post() {
    let Some(app) = app().await else { return };
    let user = app.register("suspended").await;

    sqlx::query("UPDATE users SET is_blocked = TRUE, block_reason = 'spam' WHERE id = $1")
        .bind(user.id)
        .execute(app.pool())
        .await
        .unwrap();

    let resp = app
        .post_json(
            "/auth/login",
            json!({ "email": user.email, "password": DEFAULT_PASSWORD }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["blocked"], true);
    assert_eq!(body["block_reason"], "spam");
    let token = body["token"].as_str().unwrap().to_string();

    let resp = app
        .post_json("/posts", json!({ "content": "hello" }), Some(&token))
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(resp.error_message(), "account is blocked: spam");

    let resp = app
        .post_json("/appeal", json!({ "reason": "it was not spam" }), Some(&token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
}
