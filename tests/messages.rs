//! Direct Message and Notification Tests

mod common;

use axum::http::StatusCode;
use common::app;
use serde_json::{json, Value};

fn message_ids(body: &Value) -> Vec<i64> {
    body["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_i64().unwrap())
        .collect()
}

// ===========================================================================
// Messages
// ===========================================================================

#[tokio::test]
async fn conversation_is_oldest_first_with_display_fields() {
    let Some(app) = app().await else { return };
    let alice = app.register("dm_alice").await;
    let bob = app.register("dm_bob").await;

    let first = app
        .post_json(
            "/messages/send",
            json!({ "receiver_id": bob.id, "content": "hi bob" }),
            Some(&alice.token),
        )
        .await;
    assert_eq!(first.status, StatusCode::OK);
    let first_id = first.json()["message"]["id"].as_i64().unwrap();

    let second = app
        .post_json(
            "/messages/send",
            json!({ "receiver_id": alice.id, "content": "hi alice", "reply_to_id": first_id }),
            Some(&bob.token),
        )
        .await;
    assert_eq!(second.status, StatusCode::OK);
    let second_id = second.json()["message"]["id"].as_i64().unwrap();
    assert_eq!(second.json()["message"]["reply_to_id"], first_id);

    let convo = app
        .get(&format!("/messages?user_id={}", bob.id), Some(&alice.token))
        .await
        .json();
    assert_eq!(message_ids(&convo), vec![first_id, second_id]);
    assert_eq!(convo["messages"][0]["sender_username"], alice.username.as_str());
    assert_eq!(convo["messages"][0]["receiver_username"], bob.username.as_str());
}

#[tokio::test]
async fn send_validation() {
    let Some(app) = app().await else { return };
    let alice = app.register("dv_alice").await;
    let bob = app.register("dv_bob").await;
    let carol = app.register("dv_carol").await;

    let resp = app
        .post_json(
            "/messages/send",
            json!({ "receiver_id": bob.id, "content": "   " }),
            Some(&alice.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = app
        .post_json(
            "/messages/send",
            json!({ "receiver_id": 999_999_999, "content": "hello?" }),
            Some(&alice.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    // A reply must belong to the same conversation.
    let resp = app
        .post_json(
            "/messages/send",
            json!({ "receiver_id": carol.id, "content": "private" }),
            Some(&bob.token),
        )
        .await;
    let foreign = resp.json()["message"]["id"].as_i64().unwrap();
    let resp = app
        .post_json(
            "/messages/send",
            json!({ "receiver_id": bob.id, "content": "re", "reply_to_id": foreign }),
            Some(&alice.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    app.post_json("/block", json!({ "user_id": alice.id }), Some(&bob.token))
        .await;
    let resp = app
        .post_json(
            "/messages/send",
            json!({ "receiver_id": bob.id, "content": "still there?" }),
            Some(&alice.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn allow_messages_audience_is_enforced() {
    let Some(app) = app().await else { return };
    let owner = app.register("am_owner").await;
    let follower = app.register("am_follower").await;
    let stranger = app.register("am_stranger").await;

    app.follow(&follower, &owner).await;
    app.post_json(
        "/settings/privacy",
        json!({ "settings": { "allow_messages": "followers" } }),
        Some(&owner.token),
    )
    .await;

    let resp = app
        .post_json(
            "/messages/send",
            json!({ "receiver_id": owner.id, "content": "hey" }),
            Some(&stranger.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app
        .post_json(
            "/messages/send",
            json!({ "receiver_id": owner.id, "content": "hey" }),
            Some(&follower.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
}

#[tokio::test]
async fn chats_track_unread_and_read() {
    let Some(app) = app().await else { return };
    let alice = app.register("ch_alice").await;
    let bob = app.register("ch_bob").await;

    for text in ["one", "two"] {
        app.post_json(
            "/messages/send",
            json!({ "receiver_id": bob.id, "content": text }),
            Some(&alice.token),
        )
        .await;
    }

    let chats = app.get("/messages/chats", Some(&bob.token)).await.json();
    let chat = &chats["chats"][0];
    assert_eq!(chat["other_id"], alice.id);
    assert_eq!(chat["content"], "two");
    assert_eq!(chat["unread_count"], 2);
    assert_eq!(chat["user"]["username"], alice.username.as_str());

    let resp = app
        .post_json("/messages/read", json!({ "user_id": alice.id }), Some(&bob.token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let chats = app.get("/messages/chats", Some(&bob.token)).await.json();
    assert_eq!(chats["chats"][0]["unread_count"], 0);
}

#[tokio::test]
async fn edit_pin_and_hide() {
    let Some(app) = app().await else { return };
    let alice = app.register("eph_alice").await;
    let bob = app.register("eph_bob").await;
    let eve = app.register("eph_eve").await;

    let resp = app
        .post_json(
            "/messages/send",
            json!({ "receiver_id": bob.id, "content": "typo" }),
            Some(&alice.token),
        )
        .await;
    let message_id = resp.json()["message"]["id"].as_i64().unwrap();

    // Only the sender edits.
    let resp = app
        .post_json(
            "/messages/edit",
            json!({ "message_id": message_id, "content": "hijack" }),
            Some(&bob.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    let resp = app
        .post_json(
            "/messages/edit",
            json!({ "message_id": message_id, "content": "fixed" }),
            Some(&alice.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let resp = app
        .post_json("/messages/pin", json!({ "message_id": message_id }), Some(&bob.token))
        .await;
    assert_eq!(resp.json(), json!({ "pinned": true }));
    let resp = app
        .post_json("/messages/pin", json!({ "message_id": message_id }), Some(&eve.token))
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let convo = app
        .get(&format!("/messages?user_id={}", alice.id), Some(&bob.token))
        .await
        .json();
    assert_eq!(convo["messages"][0]["content"], "fixed");
    assert_eq!(convo["messages"][0]["is_edited"], true);
    assert_eq!(convo["messages"][0]["is_pinned"], true);

    let resp = app
        .post_json("/messages/hide", json!({ "message_id": message_id }), Some(&eve.token))
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    let resp = app
        .post_json("/messages/hide", json!({ "message_id": message_id }), Some(&bob.token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let bob_view = app
        .get(&format!("/messages?user_id={}", alice.id), Some(&bob.token))
        .await
        .json();
    assert!(message_ids(&bob_view).is_empty());
    let alice_view = app
        .get(&format!("/messages?user_id={}", bob.id), Some(&alice.token))
        .await
        .json();
    assert_eq!(message_ids(&alice_view), vec![message_id]);
}

// ===========================================================================
// Notifications
// ===========================================================================

#[tokio::test]
async fn notifications_are_marked_read() {
    let Some(app) = app().await else { return };
    let alice = app.register("nt_alice").await;
    let bob = app.register("nt_bob").await;

    app.post_json(
        "/messages/send",
        json!({ "receiver_id": bob.id, "content": "ping" }),
        Some(&alice.token),
    )
    .await;

    let body = app.get("/notifications", Some(&bob.token)).await.json();
    let first = &body["notifications"][0];
    assert_eq!(first["type"], "message");
    assert_eq!(first["username"], alice.username.as_str());
    assert_eq!(first["is_read"], false);

    let resp = app
        .post_json("/notifications/read", json!({}), Some(&bob.token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let body = app.get("/notifications", Some(&bob.token)).await.json();
    assert!(body["notifications"]
        .as_array()
        .unwrap()
        .iter()
        .all(|n| n["is_read"] == true));
}
