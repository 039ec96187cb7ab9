use axum::{routing::get, routing::post, Router};

use crate::AppState;
use crate::http::handlers;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn auth() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/me", get(handlers::get_current_user))
}

pub fn feed() -> Router<AppState> {
    Router::new().route("/feed", get(handlers::home_feed))
}

pub fn posts() -> Router<AppState> {
    Router::new()
        .route("/posts", post(handlers::create_post))
        .route("/posts/view", post(handlers::view_post))
        .route("/posts/like", post(handlers::like_post))
        .route("/posts/repost", post(handlers::repost))
        .route("/posts/remove", post(handlers::remove_post))
        .route("/post", get(handlers::get_post))
        .route("/user/likes", get(handlers::user_likes))
        .route("/user/reposts", get(handlers::user_reposts))
}

pub fn comments() -> Router<AppState> {
    Router::new()
        .route(
            "/comments",
            get(handlers::list_comments).post(handlers::create_comment),
        )
        .route("/comments/like", post(handlers::like_comment))
        .route("/comments/pin", post(handlers::pin_comment))
        .route("/comments/remove", post(handlers::remove_comment))
}

pub fn users() -> Router<AppState> {
    Router::new()
        .route("/profile", get(handlers::get_profile))
        .route("/profile/update", post(handlers::update_profile))
        .route("/profile/avatar", post(handlers::set_avatar))
        .route("/profile/avatar/remove", post(handlers::remove_avatar))
        .route("/settings/theme", post(handlers::update_theme))
        .route("/settings/privacy", post(handlers::update_privacy))
        // Account management (authenticated user's own account)
        .route("/account/remove", post(handlers::remove_account))
}

pub fn social() -> Router<AppState> {
    Router::new()
        .route("/follow", post(handlers::follow_user))
        .route("/unfollow", post(handlers::unfollow_user))
        .route("/follow/request", post(handlers::respond_follow_request))
        .route("/followers", get(handlers::list_followers))
        .route("/following", get(handlers::list_following))
        .route("/friends", get(handlers::list_friends))
        .route("/block", post(handlers::block_user))
        .route("/unblock", post(handlers::unblock_user))
}

pub fn search() -> Router<AppState> {
    Router::new().route("/search", get(handlers::search_users))
}

pub fn messages() -> Router<AppState> {
    Router::new()
        .route("/messages", get(handlers::conversation))
        .route("/messages/chats", get(handlers::list_chats))
        .route("/messages/send", post(handlers::send_message))
        .route("/messages/read", post(handlers::read_messages))
        .route("/messages/edit", post(handlers::edit_message))
        .route("/messages/pin", post(handlers::pin_message))
        .route("/messages/hide", post(handlers::hide_message))
}

pub fn notifications() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(handlers::list_notifications))
        .route("/notifications/read", post(handlers::read_notifications))
}

pub fn stories() -> Router<AppState> {
    Router::new()
        .route(
            "/stories",
            get(handlers::list_stories).post(handlers::create_story),
        )
        .route("/stories/view", post(handlers::view_story))
}

pub fn moderation() -> Router<AppState> {
    Router::new()
        .route("/report", post(handlers::create_report))
        .route("/verification/request", post(handlers::request_verification))
        .route("/appeal", post(handlers::create_appeal))
}

pub fn admin() -> Router<AppState> {
    Router::new()
        .route("/admin/block", post(handlers::admin_block))
        .route("/admin/reports", get(handlers::admin_reports))
        .route("/admin/report/handle", post(handlers::admin_handle_report))
        .route("/admin/verifications", get(handlers::admin_verifications))
        .route("/admin/verify", post(handlers::admin_verify))
        .route("/admin/appeals", get(handlers::admin_appeals))
        .route("/admin/appeal/handle", post(handlers::admin_handle_appeal))
        .route("/admin/releases", post(handlers::admin_add_release))
        .route("/admin/stats", get(handlers::admin_stats))
}

pub fn releases() -> Router<AppState> {
    Router::new().route("/releases", get(handlers::list_releases))
}
