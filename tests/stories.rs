//! Story Tests

mod common;

use axum::http::StatusCode;
use common::{app, TestApp, TestUser};
use serde_json::{json, Value};

async fn post_story(app: &TestApp, user: &TestUser, visibility: Option<&str>) -> i64 {
    let mut body = json!({ "media_url": "https://cdn.example/story.jpg" });
    if let Some(visibility) = visibility {
        body["visibility"] = json!(visibility);
    }
    let resp = app.post_json("/stories", body, Some(&user.token)).await;
    assert_eq!(resp.status, StatusCode::OK, "{:?}", resp.json());
    resp.json()["story"]["id"].as_i64().unwrap()
}

async fn visible_ids(app: &TestApp, viewer: Option<&TestUser>) -> Vec<i64> {
    let body: Value = app
        .get("/stories", viewer.map(|u| u.token.as_str()))
        .await
        .json();
    body["stories"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn create_story_defaults_and_validation() {
    let Some(app) = app().await else { return };
    let user = app.register("st_create").await;

    let resp = app
        .post_json(
            "/stories",
            json!({ "media_url": "https://cdn.example/s.jpg" }),
            Some(&user.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let story = &resp.json()["story"];
    assert_eq!(story["visibility"], "all");
    assert_eq!(story["views_count"], 0);
    assert_eq!(story["username"], user.username.as_str());

    let resp = app
        .post_json("/stories", json!({ "media_url": "" }), Some(&user.token))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = app
        .post_json(
            "/stories",
            json!({ "media_url": "https://cdn.example/s.jpg", "visibility": "close_friends" }),
            Some(&user.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn visibility_filters_viewers() {
    let Some(app) = app().await else { return };
    let owner = app.register("sv_owner").await;
    let follower = app.register("sv_follower").await;
    let friend = app.register("sv_friend").await;
    let stranger = app.register("sv_stranger").await;

    app.follow(&follower, &owner).await;
    app.follow(&friend, &owner).await;
    app.follow(&owner, &friend).await;

    let public = post_story(&app, &owner, None).await;
    let followers_only = post_story(&app, &owner, Some("followers")).await;
    let mutual_only = post_story(&app, &owner, Some("mutual")).await;

    let seen = visible_ids(&app, Some(&stranger)).await;
    assert!(seen.contains(&public));
    assert!(!seen.contains(&followers_only));
    assert!(!seen.contains(&mutual_only));

    let seen = visible_ids(&app, Some(&follower)).await;
    assert!(seen.contains(&followers_only));
    assert!(!seen.contains(&mutual_only));

    let seen = visible_ids(&app, Some(&friend)).await;
    assert!(seen.contains(&followers_only));
    assert!(seen.contains(&mutual_only));

    let seen = visible_ids(&app, Some(&owner)).await;
    assert!(seen.contains(&mutual_only));

    let seen = visible_ids(&app, None).await;
    assert!(seen.contains(&public));
    assert!(!seen.contains(&followers_only));
}

#[tokio::test]
async fn views_are_idempotent() {
    let Some(app) = app().await else { return };
    let owner = app.register("sview_owner").await;
    let viewer = app.register("sview_viewer").await;
    let story_id = post_story(&app, &owner, None).await;

    for _ in 0..2 {
        let resp = app
            .post_json("/stories/view", json!({ "story_id": story_id }), Some(&viewer.token))
            .await;
        assert_eq!(resp.status, StatusCode::OK);
    }

    let body = app.get("/stories", Some(&viewer.token)).await.json();
    let story = body["stories"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["id"] == story_id)
        .cloned()
        .unwrap();
    assert_eq!(story["views_count"], 1);
    assert_eq!(story["is_viewed"], true);

    let resp = app
        .post_json("/stories/view", json!({ "story_id": 999_999_999 }), Some(&viewer.token))
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn hidden_stories_cannot_be_viewed() {
    let Some(app) = app().await else { return };
    let owner = app.register("shv_owner").await;
    let friend = app.register("shv_friend").await;
    let stranger = app.register("shv_stranger").await;
    app.follow(&friend, &owner).await;
    app.follow(&owner, &friend).await;
    let mutual_only = post_story(&app, &owner, Some("mutual")).await;

    let resp = app
        .post_json("/stories/view", json!({ "story_id": mutual_only }), Some(&stranger.token))
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    let resp = app
        .post_json("/stories/view", json!({ "story_id": mutual_only }), Some(&friend.token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let public = post_story(&app, &owner, None).await;
    app.post_json("/block", json!({ "user_id": stranger.id }), Some(&owner.token))
        .await;
    let resp = app
        .post_json("/stories/view", json!({ "story_id": public }), Some(&stranger.token))
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let views: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM story_views WHERE viewer_id = $1")
        .bind(stranger.id)
        .fetch_one(app.pool())
        .await
        .unwrap();
    assert_eq!(views, 0);
}

#[tokio::test]
async fn expired_stories_are_hidden() {
    let Some(app) = app().await else { return };
    let owner = app.register("sexp").await;
    let story_id = post_story(&app, &owner, None).await;

    sqlx::query("UPDATE stories SET expires_at = now() - INTERVAL '1 minute' WHERE id = $1")
        .bind(story_id)
        .execute(app.pool())
        .await
        .unwrap();

    assert!(!visible_ids(&app, Some(&owner)).await.contains(&story_id));
}
