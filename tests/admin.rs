//! Moderation and Admin Tests
//!
//! Covers reports, verification requests, appeals, admin-only actions and
//! releases.

mod common;

use axum::http::StatusCode;
use common::{app, TestApp, TestUser, DEFAULT_PASSWORD};
use serde_json::{json, Value};

async fn admin(app: &TestApp) -> TestUser {
    let admin = app.register("admin").await;
    app.make_admin(admin.id).await;
    admin
}

fn find_by(list: &Value, key: &str, id: i64) -> Option<Value> {
    list.as_array()?
        .iter()
        .find(|item| item[key] == id)
        .cloned()
}

// ===========================================================================
// Role gate
// ===========================================================================

#[tokio::test]
async fn non_admin_is_forbidden() {
    let Some(app) = app().await else { return };
    let user = app.register("not_admin").await;

    let resp = app.get("/admin/stats", Some(&user.token)).await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(resp.error_message(), "admin access required");

    let resp = app
        .post_json("/admin/block", json!({ "username": user.username }), Some(&user.token))
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn stats_are_counts() {
    let Some(app) = app().await else { return };
    let admin = admin(&app).await;

    let resp = app.get("/admin/stats", Some(&admin.token)).await;
    assert_eq!(resp.status, StatusCode::OK);
    let stats = resp.json();
    for key in ["users", "posts", "reports", "verifications", "appeals"] {
        assert!(stats[key].is_i64(), "{}", key);
    }
    assert!(stats["users"].as_i64().unwrap() >= 1);
}

// ===========================================================================
// Block and appeal
// ===========================================================================

#[tokio::test]
async fn admin_block_then_appeal_lifts_suspension() {
    let Some(app) = app().await else { return };
    let admin = admin(&app).await;
    let user = app.register("appealer").await;

    let resp = app
        .post_json("/admin/block", json!({ "username": user.username }), Some(&admin.token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    // Existing sessions are revoked.
    let resp = app.get("/auth/me", Some(&user.token)).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);

    let login = app
        .post_json(
            "/auth/login",
            json!({ "email": user.email, "password": DEFAULT_PASSWORD }),
            None,
        )
        .await
        .json();
    assert_eq!(login["blocked"], true);
    assert_eq!(login["block_reason"], "violation of community rules");
    let token = login["token"].as_str().unwrap().to_string();

    let resp = app
        .post_json("/appeal", json!({ "reason": "  " }), Some(&token))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    let resp = app
        .post_json("/appeal", json!({ "reason": "please" }), Some(&token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let appeals = app.get("/admin/appeals", Some(&admin.token)).await.json();
    let appeal = find_by(&appeals["appeals"], "user_id", user.id).expect("appeal listed");
    assert_eq!(appeal["username"], user.username.as_str());

    let resp = app
        .post_json(
            "/admin/appeal/handle",
            json!({ "appeal_id": appeal["id"], "action": "accept" }),
            Some(&admin.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let resp = app
        .post_json("/posts", json!({ "content": "I'm back" }), Some(&token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
}

#[tokio::test]
async fn admin_block_unknown_user_is_not_found() {
    let Some(app) = app().await else { return };
    let admin = admin(&app).await;

    let resp = app
        .post_json(
            "/admin/block",
            json!({ "username": "ghost_user_does_not_exist" }),
            Some(&admin.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

// ===========================================================================
// Reports
// ===========================================================================

#[tokio::test]
async fn report_requires_target_and_reason() {
    let Some(app) = app().await else { return };
    let user = app.register("reporter_v").await;

    let resp = app
        .post_json("/report", json!({ "reason": "spam" }), Some(&user.token))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = app
        .post_json("/report", json!({ "user_id": user.id, "reason": "" }), Some(&user.token))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn accepted_report_removes_post_and_suspends_author() {
    let Some(app) = app().await else { return };
    let admin = admin(&app).await;
    let reporter = app.register("reporter").await;
    let offender = app.register("offender").await;
    let post_id = app.create_post(&offender, "bad content").await;

    let resp = app
        .post_json(
            "/report",
            json!({ "reason": "abuse", "user_id": offender.id, "post_id": post_id }),
            Some(&reporter.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let reports = app.get("/admin/reports", Some(&admin.token)).await.json();
    let report = find_by(&reports["reports"], "reported_post_id", post_id).expect("report listed");
    assert_eq!(report["reporter_username"], reporter.username.as_str());
    assert_eq!(report["reported_username"], offender.username.as_str());
    assert_eq!(report["post_content"], "bad content");

    let resp = app
        .post_json(
            "/admin/report/handle",
            json!({ "report_id": report["id"], "action": "maybe" }),
            Some(&admin.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = app
        .post_json(
            "/admin/report/handle",
            json!({ "report_id": report["id"], "action": "accept" }),
            Some(&admin.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let resp = app.get(&format!("/post?id={}", post_id), None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let resp = app.get("/auth/me", Some(&offender.token)).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);

    let reason: String = sqlx::query_scalar("SELECT block_reason FROM users WHERE id = $1")
        .bind(offender.id)
        .fetch_one(app.pool())
        .await
        .unwrap();
    assert_eq!(reason, "removed after report");

    let resp = app
        .post_json(
            "/admin/report/handle",
            json!({ "report_id": 999_999_999, "action": "reject" }),
            Some(&admin.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn resolved_reviews_cannot_be_replayed() {
    let Some(app) = app().await else { return };
    let admin = admin(&app).await;
    let reporter = app.register("replay_reporter").await;
    let offender = app.register("replay_offender").await;

    let resp = app
        .post_json(
            "/report",
            json!({ "reason": "spam", "user_id": offender.id }),
            Some(&reporter.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let reports = app.get("/admin/reports", Some(&admin.token)).await.json();
    let report = find_by(&reports["reports"], "reported_user_id", offender.id).expect("report listed");

    let handle_report = json!({ "report_id": report["id"], "action": "accept" });
    let resp = app
        .post_json("/admin/report/handle", handle_report.clone(), Some(&admin.token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let login = app
        .post_json(
            "/auth/login",
            json!({ "email": offender.email, "password": DEFAULT_PASSWORD }),
            None,
        )
        .await
        .json();
    let token = login["token"].as_str().unwrap().to_string();
    app.post_json("/appeal", json!({ "reason": "it was a joke" }), Some(&token))
        .await;
    let appeals = app.get("/admin/appeals", Some(&admin.token)).await.json();
    let appeal = find_by(&appeals["appeals"], "user_id", offender.id).expect("appeal listed");

    let handle_appeal = json!({ "appeal_id": appeal["id"], "action": "accept" });
    let resp = app
        .post_json("/admin/appeal/handle", handle_appeal.clone(), Some(&admin.token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    // Replaying either decision leaves the lifted suspension alone.
    let resp = app
        .post_json("/admin/report/handle", handle_report, Some(&admin.token))
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    let resp = app
        .post_json("/admin/appeal/handle", handle_appeal, Some(&admin.token))
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let blocked: bool = sqlx::query_scalar("SELECT is_blocked FROM users WHERE id = $1")
        .bind(offender.id)
        .fetch_one(app.pool())
        .await
        .unwrap();
    assert!(!blocked);
}

// ===========================================================================
// Verification
// ===========================================================================

#[tokio::test]
async fn verification_request_and_review() {
    let Some(app) = app().await else { return };
    let admin = admin(&app).await;
    let artist = app.register("artist").await;

    let resp = app
        .post_json("/verification/request", json!({ "type": "artist" }), Some(&artist.token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let resp = app
        .post_json("/verification/request", json!({}), Some(&artist.token))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = app
        .post_json("/verification/request", json!({ "type": "royal" }), Some(&artist.token))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let pending = app.get("/admin/verifications", Some(&admin.token)).await.json();
    let request = find_by(&pending["verifications"], "user_id", artist.id).expect("request listed");
    assert_eq!(request["type"], "artist");

    let resp = app
        .post_json(
            "/admin/verify",
            json!({ "request_id": request["id"], "action": "accept" }),
            Some(&admin.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let me = app.get("/auth/me", Some(&artist.token)).await.json();
    assert_eq!(me["user"]["is_artist_verified"], true);
    assert_eq!(me["user"]["is_verified"], false);

    let resp = app
        .post_json(
            "/admin/verify",
            json!({ "request_id": request["id"], "action": "reject" }),
            Some(&admin.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

// ===========================================================================
// Releases
// ===========================================================================

#[tokio::test]
async fn releases_are_added_by_admin_and_listed() {
    let Some(app) = app().await else { return };
    let admin = admin(&app).await;
    let musician = app.register("musician").await;

    let resp = app
        .post_json(
            "/admin/releases",
            json!({ "username": musician.username, "title": "  " }),
            Some(&admin.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = app
        .post_json(
            "/admin/releases",
            json!({ "username": "nobody_here_at_all", "title": "Ghost" }),
            Some(&admin.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let resp = app
        .post_json(
            "/admin/releases",
            json!({
                "username": musician.username,
                "title": "Honey",
                "artist": "The Bees",
                "cover_url": "https://cdn.example/honey.jpg",
            }),
            Some(&admin.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let release = resp.json()["release"].clone();
    assert_eq!(release["user_id"], musician.id);
    assert_eq!(release["title"], "Honey");

    let listed = app
        .get(&format!("/releases?user_id={}", musician.id), None)
        .await
        .json();
    assert_eq!(listed["releases"].as_array().unwrap().len(), 1);
    assert_eq!(listed["releases"][0]["artist"], "The Bees");
}
