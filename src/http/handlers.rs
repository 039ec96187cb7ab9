use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::app::access::{AccessService, RemoveOutcome};
use crate::app::auth::{normalize_identity, AuthService, RegisterOutcome, MIN_USERNAME_LEN};
use crate::app::engagement::{CommentOutcome, EngagementService, PinOutcome};
use crate::app::feed::FeedService;
use crate::app::messages::{MessageService, SendOutcome};
use crate::app::moderation::{ModerationService, ReportResolution};
use crate::app::notifications::NotificationService;
use crate::app::posts::{PostService, RepostOutcome};
use crate::app::releases::ReleaseService;
use crate::app::search::SearchService;
use crate::app::social::{Connection, FollowOutcome, SocialService};
use crate::app::stories::{parse_visibility, StoryService};
use crate::app::users::{ProfileUpdate, UserService};
use crate::domain::engagement::{Comment, CommentLikeToggle, MAX_COMMENT_LEN};
use crate::domain::message::{ChatSummary, ConversationMessage, Message};
use crate::domain::moderation::{
    AdminStats, AppealView, ReportView, ReviewAction, VerificationKind, VerificationRequestView,
    DEFAULT_BLOCK_REASON,
};
use crate::domain::notification::{Notification, PendingRequest};
use crate::domain::post::{is_empty_post, Post, PostLikeToggle};
use crate::domain::privacy::PrivacySettings;
use crate::domain::release::Release;
use crate::domain::social_graph::{FollowRequestAction, FollowStatus};
use crate::domain::story::Story;
use crate::domain::user::{Profile, Theme, User, UserSummary};
use crate::http::extract::{flexible_id, JsonBody};
use crate::http::{AdminUser, AppError, AuthUser, MaybeAuthUser};
use crate::AppState;

const MAX_PASSWORD_LEN: usize = 128;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
pub(crate) struct StatusDocument {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    fn ok() -> Json<Self> {
        Json(Self { ok: true })
    }
}

/// Parses a required integer query parameter.
fn parse_id_param(value: Option<&str>, name: &str) -> Result<i64, AppError> {
    let value = value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::bad_request(format!("{} is required", name)))?;
    value
        .parse::<i64>()
        .map_err(|_| AppError::bad_request(format!("invalid {}", name)))
}

fn require_id(value: Option<i64>, name: &str) -> Result<i64, AppError> {
    value.ok_or_else(|| AppError::bad_request(format!("{} is required", name)))
}

/// Trims and rejects empty text.
fn require_text(value: Option<String>, name: &str) -> Result<String, AppError> {
    let value = value.unwrap_or_default().trim().to_string();
    if value.is_empty() {
        return Err(AppError::bad_request(format!("{} is required", name)));
    }
    Ok(value)
}

fn parse_page(value: Option<&str>) -> Result<i64, AppError> {
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(0),
        Some(value) => match value.parse::<i64>() {
            Ok(page) if page >= 0 => Ok(page),
            _ => Err(AppError::bad_request("invalid page")),
        },
    }
}

async fn caller_is_admin(state: &AppState, user_id: i64) -> Result<bool, AppError> {
    AccessService::new(state.db.clone())
        .is_admin(user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id, "failed to check admin role");
            AppError::internal("failed to check admin role")
        })
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.db.ping().await.is_ok() {
        "ok"
    } else {
        "degraded"
    };
    Json(HealthResponse { status })
}

pub(crate) async fn fallback() -> Json<StatusDocument> {
    Json(StatusDocument {
        status: "ok",
        version: "1.0",
    })
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
}

pub async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let (username, email) = normalize_identity(
        payload.username.as_deref().unwrap_or(""),
        payload.email.as_deref().unwrap_or(""),
    );
    let password = payload.password.unwrap_or_default();
    if username.is_empty() || email.is_empty() || password.is_empty() {
        return Err(AppError::bad_request("username, email and password are required"));
    }
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(AppError::bad_request("username must be at least 3 characters"));
    }
    if password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::bad_request("password must be at most 128 characters"));
    }

    let service = AuthService::new(state.db.clone(), state.tokens.clone());
    let outcome = service
        .register(&username, &email, &password)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to register user");
            AppError::internal("failed to register user")
        })?;

    match outcome {
        RegisterOutcome::Registered(session) => Ok(Json(SessionResponse {
            token: session.token,
            user_id: session.user_id,
            blocked: None,
            block_reason: None,
        })),
        RegisterOutcome::Taken => Err(AppError::bad_request("username or email already taken")),
        RegisterOutcome::Conflict => Err(AppError::conflict("username or email already taken")),
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let email = payload.email.unwrap_or_default().trim().to_lowercase();
    let password = payload.password.unwrap_or_default();
    if email.is_empty() || password.is_empty() {
        return Err(AppError::bad_request("email and password are required"));
    }
    if password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::bad_request("invalid email or password"));
    }

    let service = AuthService::new(state.db.clone(), state.tokens.clone());
    let session = service.login(&email, &password).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to login");
        AppError::internal("failed to login")
    })?;

    let session = session.ok_or_else(|| AppError::bad_request("invalid email or password"))?;
    let (blocked, block_reason) = if session.is_blocked {
        (Some(true), Some(session.block_reason))
    } else {
        (None, None)
    };

    Ok(Json(SessionResponse {
        token: session.token,
        user_id: session.user_id,
        blocked,
        block_reason,
    }))
}

#[derive(Serialize)]
pub struct UserResponse {
    pub user: User,
}

pub async fn get_current_user(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, AppError> {
    let service = AuthService::new(state.db.clone(), state.tokens.clone());
    let user = service.me(auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = auth.user_id, "failed to load user");
        AppError::internal("failed to load user")
    })?;

    match user {
        Some(user) => Ok(Json(UserResponse { user })),
        None => Err(AppError::not_found("user not found")),
    }
}

pub async fn logout(auth: AuthUser, State(state): State<AppState>) -> Json<OkResponse> {
    let service = AuthService::new(state.db.clone(), state.tokens.clone());
    service.logout(&auth.token);
    OkResponse::ok()
}

// ---------------------------------------------------------------------------
// Feed and posts
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct FeedQuery {
    pub page: Option<String>,
}

#[derive(Serialize)]
pub struct PostsResponse {
    pub posts: Vec<Post>,
}

pub async fn home_feed(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<PostsResponse>, AppError> {
    let page = parse_page(query.page.as_deref())?;

    let service = FeedService::new(state.db.clone());
    let posts = service
        .page(auth.user_id(), page, state.feed_page_size)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, page, "failed to load feed");
            AppError::internal("failed to load feed")
        })?;

    Ok(Json(PostsResponse { posts }))
}

#[derive(Deserialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub media_urls: Vec<String>,
}

#[derive(Serialize)]
pub struct PostResponse {
    pub post: Post,
}

pub async fn create_post(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreatePostRequest>,
) -> Result<Json<PostResponse>, AppError> {
    let content = payload.content.unwrap_or_default().trim().to_string();
    let media_urls: Vec<String> = payload
        .media_urls
        .into_iter()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .collect();
    if is_empty_post(&content, &media_urls) {
        return Err(AppError::bad_request("post must have content or media"));
    }

    let service = PostService::new(state.db.clone());
    let post = service
        .create(auth.user_id, &content, media_urls)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = auth.user_id, "failed to create post");
            AppError::internal("failed to create post")
        })?;

    Ok(Json(PostResponse { post }))
}

#[derive(Deserialize)]
pub struct PostIdRequest {
    #[serde(default, deserialize_with = "flexible_id")]
    pub post_id: Option<i64>,
}

pub async fn view_post(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<PostIdRequest>,
) -> Result<Json<OkResponse>, AppError> {
    let Some(post_id) = payload.post_id else {
        return Ok(OkResponse::ok());
    };

    let service = PostService::new(state.db.clone());
    service.record_view(post_id).await.map_err(|err| {
        tracing::error!(error = ?err, post_id, "failed to record view");
        AppError::internal("failed to record view")
    })?;

    Ok(OkResponse::ok())
}

pub async fn like_post(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<PostIdRequest>,
) -> Result<Json<PostLikeToggle>, AppError> {
    let post_id = require_id(payload.post_id, "post_id")?;

    let service = PostService::new(state.db.clone());
    let toggle = service
        .toggle_like(auth.user_id, post_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = auth.user_id, post_id, "failed to toggle like");
            AppError::internal("failed to toggle like")
        })?;

    toggle
        .map(Json)
        .ok_or_else(|| AppError::not_found("post not found"))
}

pub async fn repost(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<PostIdRequest>,
) -> Result<Json<PostResponse>, AppError> {
    let post_id = require_id(payload.post_id, "post_id")?;

    let service = PostService::new(state.db.clone());
    let outcome = service.repost(auth.user_id, post_id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = auth.user_id, post_id, "failed to repost");
        AppError::internal("failed to repost")
    })?;

    match outcome {
        RepostOutcome::Reposted(post) => Ok(Json(PostResponse { post })),
        RepostOutcome::NotFound => Err(AppError::not_found("post not found")),
    }
}

pub async fn remove_post(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<PostIdRequest>,
) -> Result<Json<OkResponse>, AppError> {
    let post_id = require_id(payload.post_id, "post_id")?;
    let is_admin = caller_is_admin(&state, auth.user_id).await?;

    let service = PostService::new(state.db.clone());
    let outcome = service
        .remove(auth.user_id, is_admin, post_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = auth.user_id, post_id, "failed to remove post");
            AppError::internal("failed to remove post")
        })?;

    match outcome {
        RemoveOutcome::Removed => {
            if is_admin {
                tracing::info!(admin_id = auth.user_id, post_id, "post removed");
            }
            Ok(OkResponse::ok())
        }
        RemoveOutcome::NotFound => Err(AppError::not_found("post not found")),
        RemoveOutcome::Forbidden => Err(AppError::forbidden("cannot remove this post")),
    }
}

#[derive(Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

pub async fn get_post(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> Result<Json<PostResponse>, AppError> {
    let post_id = parse_id_param(query.id.as_deref(), "id")?;

    let service = PostService::new(state.db.clone());
    let post = service
        .get_visible(auth.user_id(), post_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id, "failed to load post");
            AppError::internal("failed to load post")
        })?;

    post.map(|post| Json(PostResponse { post }))
        .ok_or_else(|| AppError::not_found("post not found"))
}

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Option<String>,
}

#[derive(Serialize)]
pub struct HiddenPostsResponse {
    pub posts: Vec<Post>,
    pub hidden: bool,
}

pub async fn user_likes(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<UserIdQuery>,
) -> Result<Json<HiddenPostsResponse>, AppError> {
    let user_id = parse_id_param(query.user_id.as_deref(), "user_id")?;

    let service = PostService::new(state.db.clone());
    let listing = service
        .liked_by_user(auth.user_id(), user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id, "failed to load liked posts");
            AppError::internal("failed to load liked posts")
        })?;

    Ok(Json(HiddenPostsResponse {
        posts: listing.items,
        hidden: listing.hidden,
    }))
}

pub async fn user_reposts(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<UserIdQuery>,
) -> Result<Json<HiddenPostsResponse>, AppError> {
    let user_id = parse_id_param(query.user_id.as_deref(), "user_id")?;

    let service = PostService::new(state.db.clone());
    let listing = service
        .reposts_by_user(auth.user_id(), user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id, "failed to load reposts");
            AppError::internal("failed to load reposts")
        })?;

    Ok(Json(HiddenPostsResponse {
        posts: listing.items,
        hidden: listing.hidden,
    }))
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct PostIdQuery {
    pub post_id: Option<String>,
}

#[derive(Serialize)]
pub struct CommentsResponse {
    pub comments: Vec<Comment>,
}

pub async fn list_comments(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<PostIdQuery>,
) -> Result<Json<CommentsResponse>, AppError> {
    let post_id = parse_id_param(query.post_id.as_deref(), "post_id")?;

    let service = EngagementService::new(state.db.clone());
    let comments = service
        .list_comments(auth.user_id(), post_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id, "failed to list comments");
            AppError::internal("failed to list comments")
        })?
        .ok_or_else(|| AppError::not_found("post not found"))?;

    Ok(Json(CommentsResponse { comments }))
}

#[derive(Deserialize)]
pub struct CreateCommentRequest {
    #[serde(default, deserialize_with = "flexible_id")]
    pub post_id: Option<i64>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "flexible_id")]
    pub parent_id: Option<i64>,
}

#[derive(Serialize)]
pub struct CommentResponse {
    pub comment: Comment,
}

pub async fn create_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateCommentRequest>,
) -> Result<Json<CommentResponse>, AppError> {
    let post_id = require_id(payload.post_id, "post_id")?;
    let content = require_text(payload.content, "content")?;
    if content.chars().count() > MAX_COMMENT_LEN {
        return Err(AppError::bad_request("comment must be at most 2000 characters"));
    }

    let service = EngagementService::new(state.db.clone());
    let outcome = service
        .create_comment(auth.user_id, post_id, &content, payload.parent_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = auth.user_id, post_id, "failed to create comment");
            AppError::internal("failed to create comment")
        })?;

    match outcome {
        CommentOutcome::Created(comment) => Ok(Json(CommentResponse { comment })),
        CommentOutcome::PostNotFound => Err(AppError::not_found("post not found")),
        CommentOutcome::InvalidParent => Err(AppError::bad_request("invalid parent comment")),
    }
}

#[derive(Deserialize)]
pub struct CommentIdRequest {
    #[serde(default, deserialize_with = "flexible_id")]
    pub comment_id: Option<i64>,
}

pub async fn like_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CommentIdRequest>,
) -> Result<Json<CommentLikeToggle>, AppError> {
    let comment_id = require_id(payload.comment_id, "comment_id")?;

    let service = EngagementService::new(state.db.clone());
    let toggle = service
        .toggle_comment_like(auth.user_id, comment_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = auth.user_id, comment_id, "failed to toggle comment like");
            AppError::internal("failed to toggle comment like")
        })?;

    toggle
        .map(Json)
        .ok_or_else(|| AppError::not_found("comment not found"))
}

#[derive(Serialize)]
pub struct PinnedResponse {
    pub pinned: bool,
}

pub async fn pin_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CommentIdRequest>,
) -> Result<Json<PinnedResponse>, AppError> {
    let comment_id = require_id(payload.comment_id, "comment_id")?;

    let service = EngagementService::new(state.db.clone());
    let outcome = service
        .toggle_pin(auth.user_id, comment_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = auth.user_id, comment_id, "failed to pin comment");
            AppError::internal("failed to pin comment")
        })?;

    match outcome {
        PinOutcome::Pinned(pinned) => Ok(Json(PinnedResponse { pinned })),
        PinOutcome::NotFound => Err(AppError::not_found("comment not found")),
        PinOutcome::Forbidden => Err(AppError::forbidden("only the post owner can pin comments")),
    }
}

pub async fn remove_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CommentIdRequest>,
) -> Result<Json<OkResponse>, AppError> {
    let comment_id = require_id(payload.comment_id, "comment_id")?;
    let is_admin = caller_is_admin(&state, auth.user_id).await?;

    let service = EngagementService::new(state.db.clone());
    let outcome = service
        .remove_comment(auth.user_id, is_admin, comment_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = auth.user_id, comment_id, "failed to remove comment");
            AppError::internal("failed to remove comment")
        })?;

    match outcome {
        RemoveOutcome::Removed => Ok(OkResponse::ok()),
        RemoveOutcome::NotFound => Err(AppError::not_found("comment not found")),
        RemoveOutcome::Forbidden => Err(AppError::forbidden("cannot remove this comment")),
    }
}

// ---------------------------------------------------------------------------
// Profile and settings
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct ProfileQuery {
    pub username: Option<String>,
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub profile: Profile,
    pub posts: Vec<Post>,
}

pub async fn get_profile(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<ProfileQuery>,
) -> Result<Json<ProfileResponse>, AppError> {
    let username = require_text(query.username, "username")?.to_lowercase();

    let service = UserService::new(state.db.clone());
    let page = service
        .profile(auth.user_id(), &username)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, username = %username, "failed to load profile");
            AppError::internal("failed to load profile")
        })?;

    page.map(|page| {
        Json(ProfileResponse {
            profile: page.profile,
            posts: page.posts,
        })
    })
    .ok_or_else(|| AppError::not_found("user not found"))
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub is_private: Option<bool>,
    #[serde(default)]
    pub links: Option<Value>,
}

pub async fn update_profile(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<UpdateProfileRequest>,
) -> Result<Json<OkResponse>, AppError> {
    let display_name = match payload.display_name {
        Some(name) if name.trim().is_empty() => {
            return Err(AppError::bad_request("display_name cannot be empty"));
        }
        Some(name) => Some(name.trim().to_string()),
        None => None,
    };
    let links = match payload.links {
        Some(Value::Null) | None => None,
        Some(links @ Value::Object(_)) => Some(links),
        Some(_) => return Err(AppError::bad_request("links must be an object")),
    };

    let update = ProfileUpdate {
        display_name,
        bio: payload.bio.map(|bio| bio.trim().to_string()),
        is_private: payload.is_private,
        links,
    };

    let service = UserService::new(state.db.clone());
    service
        .update_profile(auth.user_id, update)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = auth.user_id, "failed to update profile");
            AppError::internal("failed to update profile")
        })?;

    Ok(OkResponse::ok())
}

#[derive(Deserialize)]
pub struct AvatarRequest {
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Serialize)]
pub struct AvatarsResponse {
    pub ok: bool,
    pub avatars: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

pub async fn set_avatar(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<AvatarRequest>,
) -> Result<Json<AvatarsResponse>, AppError> {
    let avatar_url = require_text(payload.avatar_url, "avatar_url")?;

    let service = UserService::new(state.db.clone());
    let avatars = service
        .set_avatar(auth.user_id, &avatar_url)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = auth.user_id, "failed to set avatar");
            AppError::internal("failed to set avatar")
        })?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    Ok(Json(AvatarsResponse {
        ok: true,
        avatars,
        avatar_url: None,
    }))
}

pub async fn remove_avatar(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<AvatarRequest>,
) -> Result<Json<AvatarsResponse>, AppError> {
    let avatar_url = require_text(payload.avatar_url, "avatar_url")?;

    let service = UserService::new(state.db.clone());
    let gallery = service
        .remove_avatar(auth.user_id, &avatar_url)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = auth.user_id, "failed to remove avatar");
            AppError::internal("failed to remove avatar")
        })?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    Ok(Json(AvatarsResponse {
        ok: true,
        avatars: gallery.avatars,
        avatar_url: Some(gallery.avatar_url),
    }))
}

#[derive(Deserialize)]
pub struct ThemeRequest {
    #[serde(default)]
    pub theme: Option<String>,
}

pub async fn update_theme(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<ThemeRequest>,
) -> Result<Json<OkResponse>, AppError> {
    let theme = match payload.theme.as_deref().map(str::trim) {
        None | Some("") => Theme::default(),
        Some(value) => {
            Theme::from_db(value).ok_or_else(|| AppError::bad_request("unknown theme"))?
        }
    };

    let service = UserService::new(state.db.clone());
    service.set_theme(auth.user_id, theme).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = auth.user_id, "failed to update theme");
        AppError::internal("failed to update theme")
    })?;

    Ok(OkResponse::ok())
}

#[derive(Deserialize)]
pub struct PrivacyRequest {
    #[serde(default)]
    pub settings: Option<Value>,
}

pub async fn update_privacy(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<PrivacyRequest>,
) -> Result<Json<OkResponse>, AppError> {
    let settings: PrivacySettings = match payload.settings {
        None | Some(Value::Null) => PrivacySettings::default(),
        Some(value) => serde_json::from_value(value)
            .map_err(|_| AppError::bad_request("invalid privacy settings"))?,
    };

    let service = UserService::new(state.db.clone());
    service
        .set_privacy(auth.user_id, &settings)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = auth.user_id, "failed to update privacy");
            AppError::internal("failed to update privacy")
        })?;

    Ok(OkResponse::ok())
}

pub async fn remove_account(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<OkResponse>, AppError> {
    let service = UserService::new(state.db.clone());
    let removed = service.remove_account(auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = auth.user_id, "failed to remove account");
        AppError::internal("failed to remove account")
    })?;
    if !removed {
        return Err(AppError::not_found("user not found"));
    }

    state.tokens.revoke_user(auth.user_id);
    Ok(OkResponse::ok())
}

// ---------------------------------------------------------------------------
// Social graph
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct UserIdRequest {
    #[serde(default, deserialize_with = "flexible_id")]
    pub user_id: Option<i64>,
}

#[derive(Serialize)]
pub struct FollowResponse {
    pub status: FollowStatus,
}

pub async fn follow_user(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<UserIdRequest>,
) -> Result<Json<FollowResponse>, AppError> {
    let target_id = require_id(payload.user_id, "user_id")?;
    if auth.user_id == target_id {
        return Err(AppError::bad_request("cannot follow yourself"));
    }

    let service = SocialService::new(state.db.clone());
    let outcome = service.follow(auth.user_id, target_id).await.map_err(|err| {
        tracing::error!(error = ?err, follower_id = auth.user_id, following_id = target_id, "failed to follow user");
        AppError::internal("failed to follow user")
    })?;

    match outcome {
        FollowOutcome::Status(status) => Ok(Json(FollowResponse { status })),
        FollowOutcome::NotFound => Err(AppError::not_found("user not found")),
        FollowOutcome::Blocked => Err(AppError::forbidden("cannot follow this user")),
    }
}

pub async fn unfollow_user(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<UserIdRequest>,
) -> Result<Json<OkResponse>, AppError> {
    let target_id = require_id(payload.user_id, "user_id")?;

    let service = SocialService::new(state.db.clone());
    service.unfollow(auth.user_id, target_id).await.map_err(|err| {
        tracing::error!(error = ?err, follower_id = auth.user_id, following_id = target_id, "failed to unfollow user");
        AppError::internal("failed to unfollow user")
    })?;

    Ok(OkResponse::ok())
}

#[derive(Deserialize)]
pub struct FollowRequestResponse {
    #[serde(default, deserialize_with = "flexible_id")]
    pub from_user_id: Option<i64>,
    #[serde(default)]
    pub action: Option<String>,
}

pub async fn respond_follow_request(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<FollowRequestResponse>,
) -> Result<Json<OkResponse>, AppError> {
    let requester_id = require_id(payload.from_user_id, "from_user_id")?;
    let action = FollowRequestAction::parse(payload.action.as_deref().unwrap_or(""));

    let service = SocialService::new(state.db.clone());
    service
        .respond_to_request(auth.user_id, requester_id, action)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = auth.user_id, requester_id, "failed to answer follow request");
            AppError::internal("failed to answer follow request")
        })?;

    Ok(OkResponse::ok())
}

#[derive(Serialize)]
pub struct UsersResponse {
    pub users: Vec<UserSummary>,
    pub hidden: bool,
}

async fn list_connections(
    auth: MaybeAuthUser,
    state: AppState,
    query: UserIdQuery,
    connection: Connection,
) -> Result<Json<UsersResponse>, AppError> {
    let user_id = parse_id_param(query.user_id.as_deref(), "user_id")?;

    let service = SocialService::new(state.db.clone());
    let listing = service
        .list(auth.user_id(), user_id, connection)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id, ?connection, "failed to list connections");
            AppError::internal("failed to list connections")
        })?;

    Ok(Json(UsersResponse {
        users: listing.items,
        hidden: listing.hidden,
    }))
}

pub async fn list_followers(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<UserIdQuery>,
) -> Result<Json<UsersResponse>, AppError> {
    list_connections(auth, state, query, Connection::Followers).await
}

pub async fn list_following(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<UserIdQuery>,
) -> Result<Json<UsersResponse>, AppError> {
    list_connections(auth, state, query, Connection::Following).await
}

pub async fn list_friends(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<UserIdQuery>,
) -> Result<Json<UsersResponse>, AppError> {
    list_connections(auth, state, query, Connection::Friends).await
}

pub async fn block_user(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<UserIdRequest>,
) -> Result<Json<OkResponse>, AppError> {
    let blocked_id = require_id(payload.user_id, "user_id")?;
    if auth.user_id == blocked_id {
        return Err(AppError::bad_request("cannot block yourself"));
    }

    let service = SocialService::new(state.db.clone());
    service.block(auth.user_id, blocked_id).await.map_err(|err| {
        tracing::error!(error = ?err, blocker_id = auth.user_id, blocked_id, "failed to block user");
        AppError::internal("failed to block user")
    })?;

    Ok(OkResponse::ok())
}

pub async fn unblock_user(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<UserIdRequest>,
) -> Result<Json<OkResponse>, AppError> {
    let blocked_id = require_id(payload.user_id, "user_id")?;

    let service = SocialService::new(state.db.clone());
    service.unblock(auth.user_id, blocked_id).await.map_err(|err| {
        tracing::error!(error = ?err, blocker_id = auth.user_id, blocked_id, "failed to unblock user");
        AppError::internal("failed to unblock user")
    })?;

    Ok(OkResponse::ok())
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub users: Vec<UserSummary>,
}

pub async fn search_users(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    let q = query.q.unwrap_or_default();

    let service = SearchService::new(state.db.clone());
    let users = service
        .search_users(auth.user_id(), &q)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to search users");
            AppError::internal("failed to search users")
        })?;

    Ok(Json(SearchResponse { users }))
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ConversationResponse {
    pub messages: Vec<ConversationMessage>,
}

pub async fn conversation(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<UserIdQuery>,
) -> Result<Json<ConversationResponse>, AppError> {
    let other_id = parse_id_param(query.user_id.as_deref(), "user_id")?;

    let service = MessageService::new(state.db.clone());
    let messages = service
        .conversation(auth.user_id, other_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = auth.user_id, other_id, "failed to load messages");
            AppError::internal("failed to load messages")
        })?;

    Ok(Json(ConversationResponse { messages }))
}

#[derive(Serialize)]
pub struct ChatsResponse {
    pub chats: Vec<ChatSummary>,
}

pub async fn list_chats(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ChatsResponse>, AppError> {
    let service = MessageService::new(state.db.clone());
    let chats = service.chats(auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = auth.user_id, "failed to load chats");
        AppError::internal("failed to load chats")
    })?;

    Ok(Json(ChatsResponse { chats }))
}

#[derive(Deserialize)]
pub struct SendMessageRequest {
    #[serde(default, deserialize_with = "flexible_id")]
    pub receiver_id: Option<i64>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "flexible_id")]
    pub reply_to_id: Option<i64>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: Message,
}

pub async fn send_message(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<SendMessageRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let receiver_id = require_id(payload.receiver_id, "receiver_id")?;
    let content = require_text(payload.content, "content")?;

    let service = MessageService::new(state.db.clone());
    let outcome = service
        .send(auth.user_id, receiver_id, &content, payload.reply_to_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, sender_id = auth.user_id, receiver_id, "failed to send message");
            AppError::internal("failed to send message")
        })?;

    match outcome {
        SendOutcome::Sent(message) => Ok(Json(MessageResponse { message })),
        SendOutcome::ReceiverNotFound => Err(AppError::not_found("user not found")),
        SendOutcome::Blocked => Err(AppError::forbidden("cannot message this user")),
        SendOutcome::NotAllowed => {
            Err(AppError::forbidden("this user does not accept messages from you"))
        }
        SendOutcome::InvalidReply => Err(AppError::bad_request("invalid reply_to_id")),
    }
}

pub async fn read_messages(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<UserIdRequest>,
) -> Result<Json<OkResponse>, AppError> {
    let other_id = require_id(payload.user_id, "user_id")?;

    let service = MessageService::new(state.db.clone());
    service.mark_read(auth.user_id, other_id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = auth.user_id, other_id, "failed to mark messages read");
        AppError::internal("failed to mark messages read")
    })?;

    Ok(OkResponse::ok())
}

#[derive(Deserialize)]
pub struct EditMessageRequest {
    #[serde(default, deserialize_with = "flexible_id")]
    pub message_id: Option<i64>,
    #[serde(default)]
    pub content: Option<String>,
}

pub async fn edit_message(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<EditMessageRequest>,
) -> Result<Json<OkResponse>, AppError> {
    let message_id = require_id(payload.message_id, "message_id")?;
    let content = require_text(payload.content, "content")?;

    let service = MessageService::new(state.db.clone());
    let edited = service
        .edit(auth.user_id, message_id, &content)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = auth.user_id, message_id, "failed to edit message");
            AppError::internal("failed to edit message")
        })?;

    match edited {
        Some(_) => Ok(OkResponse::ok()),
        None => Err(AppError::not_found("message not found")),
    }
}

#[derive(Deserialize)]
pub struct MessageIdRequest {
    #[serde(default, deserialize_with = "flexible_id")]
    pub message_id: Option<i64>,
}

pub async fn pin_message(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<MessageIdRequest>,
) -> Result<Json<PinnedResponse>, AppError> {
    let message_id = require_id(payload.message_id, "message_id")?;

    let service = MessageService::new(state.db.clone());
    let pinned = service
        .toggle_pin(auth.user_id, message_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = auth.user_id, message_id, "failed to pin message");
            AppError::internal("failed to pin message")
        })?;

    pinned
        .map(|pinned| Json(PinnedResponse { pinned }))
        .ok_or_else(|| AppError::not_found("message not found"))
}

pub async fn hide_message(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<MessageIdRequest>,
) -> Result<Json<OkResponse>, AppError> {
    let message_id = require_id(payload.message_id, "message_id")?;

    let service = MessageService::new(state.db.clone());
    let hidden = service.hide(auth.user_id, message_id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = auth.user_id, message_id, "failed to hide message");
        AppError::internal("failed to hide message")
    })?;

    if !hidden {
        return Err(AppError::not_found("message not found"));
    }
    Ok(OkResponse::ok())
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<Notification>,
    pub pending_requests: Vec<PendingRequest>,
}

pub async fn list_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<NotificationsResponse>, AppError> {
    let service = NotificationService::new(state.db.clone());
    let (notifications, pending_requests) = service.list(auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = auth.user_id, "failed to list notifications");
        AppError::internal("failed to list notifications")
    })?;

    Ok(Json(NotificationsResponse {
        notifications,
        pending_requests,
    }))
}

pub async fn read_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<OkResponse>, AppError> {
    let service = NotificationService::new(state.db.clone());
    service.mark_all_read(auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = auth.user_id, "failed to mark notifications read");
        AppError::internal("failed to mark notifications read")
    })?;

    Ok(OkResponse::ok())
}

// ---------------------------------------------------------------------------
// Stories
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct StoriesResponse {
    pub stories: Vec<Story>,
}

pub async fn list_stories(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
) -> Result<Json<StoriesResponse>, AppError> {
    let service = StoryService::new(state.db.clone());
    let stories = service.list(auth.user_id()).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to list stories");
        AppError::internal("failed to list stories")
    })?;

    Ok(Json(StoriesResponse { stories }))
}

#[derive(Deserialize)]
pub struct CreateStoryRequest {
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub visibility: Option<String>,
}

#[derive(Serialize)]
pub struct StoryResponse {
    pub story: Story,
}

pub async fn create_story(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateStoryRequest>,
) -> Result<Json<StoryResponse>, AppError> {
    let media_url = require_text(payload.media_url, "media_url")?;
    let visibility = parse_visibility(payload.visibility.as_deref())
        .ok_or_else(|| AppError::bad_request("visibility must be all, followers or mutual"))?;

    let service = StoryService::new(state.db.clone());
    let story = service
        .create(auth.user_id, &media_url, visibility, state.story_ttl_hours)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = auth.user_id, "failed to create story");
            AppError::internal("failed to create story")
        })?;

    Ok(Json(StoryResponse { story }))
}

#[derive(Deserialize)]
pub struct StoryIdRequest {
    #[serde(default, deserialize_with = "flexible_id")]
    pub story_id: Option<i64>,
}

pub async fn view_story(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<StoryIdRequest>,
) -> Result<Json<OkResponse>, AppError> {
    let story_id = require_id(payload.story_id, "story_id")?;

    let service = StoryService::new(state.db.clone());
    let recorded = service
        .record_view(auth.user_id, story_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = auth.user_id, story_id, "failed to record story view");
            AppError::internal("failed to record story view")
        })?;

    if !recorded {
        return Err(AppError::not_found("story not found"));
    }
    Ok(OkResponse::ok())
}

// ---------------------------------------------------------------------------
// Reports, verification, appeals
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct ReportRequest {
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default, deserialize_with = "flexible_id")]
    pub user_id: Option<i64>,
    #[serde(default, deserialize_with = "flexible_id")]
    pub post_id: Option<i64>,
}

pub async fn create_report(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<ReportRequest>,
) -> Result<Json<OkResponse>, AppError> {
    if payload.user_id.is_none() && payload.post_id.is_none() {
        return Err(AppError::bad_request("user_id or post_id is required"));
    }
    let reason = require_text(payload.reason, "reason")?;

    let service = ModerationService::new(state.db.clone());
    service
        .report(auth.user_id, &reason, payload.user_id, payload.post_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, reporter_id = auth.user_id, "failed to create report");
            AppError::internal("failed to create report")
        })?;

    Ok(OkResponse::ok())
}

#[derive(Deserialize)]
pub struct VerificationRequest {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

pub async fn request_verification(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<VerificationRequest>,
) -> Result<Json<OkResponse>, AppError> {
    let kind = match payload.kind.as_deref().map(str::trim) {
        None | Some("") => VerificationKind::Standard,
        Some(value) => VerificationKind::from_db(value)
            .ok_or_else(|| AppError::bad_request("type must be standard or artist"))?,
    };

    let service = ModerationService::new(state.db.clone());
    let created = service
        .request_verification(auth.user_id, kind)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = auth.user_id, "failed to request verification");
            AppError::internal("failed to request verification")
        })?;

    if !created {
        return Err(AppError::bad_request("verification request already pending"));
    }
    Ok(OkResponse::ok())
}

#[derive(Deserialize)]
pub struct AppealRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

pub async fn create_appeal(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<AppealRequest>,
) -> Result<Json<OkResponse>, AppError> {
    let reason = require_text(payload.reason, "reason")?;

    let service = ModerationService::new(state.db.clone());
    service.appeal(auth.user_id, &reason).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = auth.user_id, "failed to create appeal");
        AppError::internal("failed to create appeal")
    })?;

    Ok(OkResponse::ok())
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

fn parse_review_action(action: Option<&str>) -> Result<ReviewAction, AppError> {
    ReviewAction::parse(action.unwrap_or(""))
        .ok_or_else(|| AppError::bad_request("action must be accept or reject"))
}

#[derive(Deserialize)]
pub struct AdminBlockRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

pub async fn admin_block(
    admin: AdminUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<AdminBlockRequest>,
) -> Result<Json<OkResponse>, AppError> {
    let username = require_text(payload.username, "username")?.to_lowercase();
    let reason = payload
        .reason
        .map(|reason| reason.trim().to_string())
        .filter(|reason| !reason.is_empty())
        .unwrap_or_else(|| DEFAULT_BLOCK_REASON.to_string());

    let service = ModerationService::new(state.db.clone());
    let user_id = service
        .suspend_by_username(&username, &reason)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, admin_id = admin.user_id, "failed to block user");
            AppError::internal("failed to block user")
        })?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    let revoked = state.tokens.revoke_user(user_id);
    tracing::info!(admin_id = admin.user_id, user_id, revoked, "user suspended");
    Ok(OkResponse::ok())
}

#[derive(Serialize)]
pub struct ReportsResponse {
    pub reports: Vec<ReportView>,
}

pub async fn admin_reports(
    admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<ReportsResponse>, AppError> {
    let service = ModerationService::new(state.db.clone());
    let reports = service.pending_reports().await.map_err(|err| {
        tracing::error!(error = ?err, admin_id = admin.user_id, "failed to list reports");
        AppError::internal("failed to list reports")
    })?;

    Ok(Json(ReportsResponse { reports }))
}

#[derive(Deserialize)]
pub struct HandleReportRequest {
    #[serde(default, deserialize_with = "flexible_id")]
    pub report_id: Option<i64>,
    #[serde(default)]
    pub action: Option<String>,
}

pub async fn admin_handle_report(
    admin: AdminUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<HandleReportRequest>,
) -> Result<Json<OkResponse>, AppError> {
    let report_id = require_id(payload.report_id, "report_id")?;
    let action = parse_review_action(payload.action.as_deref())?;

    let service = ModerationService::new(state.db.clone());
    let resolution = service
        .handle_report(report_id, action)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, admin_id = admin.user_id, report_id, "failed to handle report");
            AppError::internal("failed to handle report")
        })?;

    match resolution {
        ReportResolution::Resolved { suspended_user_id } => {
            if let Some(user_id) = suspended_user_id {
                state.tokens.revoke_user(user_id);
            }
            tracing::info!(admin_id = admin.user_id, report_id, ?action, "report handled");
            Ok(OkResponse::ok())
        }
        ReportResolution::NotFound => Err(AppError::not_found("report not found")),
    }
}

#[derive(Serialize)]
pub struct VerificationsResponse {
    pub verifications: Vec<VerificationRequestView>,
}

pub async fn admin_verifications(
    admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<VerificationsResponse>, AppError> {
    let service = ModerationService::new(state.db.clone());
    let verifications = service.pending_verifications().await.map_err(|err| {
        tracing::error!(error = ?err, admin_id = admin.user_id, "failed to list verifications");
        AppError::internal("failed to list verifications")
    })?;

    Ok(Json(VerificationsResponse { verifications }))
}

#[derive(Deserialize)]
pub struct VerifyRequest {
    #[serde(default, deserialize_with = "flexible_id")]
    pub request_id: Option<i64>,
    #[serde(default)]
    pub action: Option<String>,
}

pub async fn admin_verify(
    admin: AdminUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<VerifyRequest>,
) -> Result<Json<OkResponse>, AppError> {
    let request_id = require_id(payload.request_id, "request_id")?;
    let action = parse_review_action(payload.action.as_deref())?;

    let service = ModerationService::new(state.db.clone());
    let found = service
        .review_verification(request_id, action)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, admin_id = admin.user_id, request_id, "failed to review verification");
            AppError::internal("failed to review verification")
        })?;

    if !found {
        return Err(AppError::not_found("verification request not found"));
    }
    tracing::info!(admin_id = admin.user_id, request_id, ?action, "verification reviewed");
    Ok(OkResponse::ok())
}

#[derive(Serialize)]
pub struct AppealsResponse {
    pub appeals: Vec<AppealView>,
}

pub async fn admin_appeals(
    admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<AppealsResponse>, AppError> {
    let service = ModerationService::new(state.db.clone());
    let appeals = service.pending_appeals().await.map_err(|err| {
        tracing::error!(error = ?err, admin_id = admin.user_id, "failed to list appeals");
        AppError::internal("failed to list appeals")
    })?;

    Ok(Json(AppealsResponse { appeals }))
}

#[derive(Deserialize)]
pub struct HandleAppealRequest {
    #[serde(default, deserialize_with = "flexible_id")]
    pub appeal_id: Option<i64>,
    #[serde(default)]
    pub action: Option<String>,
}

pub async fn admin_handle_appeal(
    admin: AdminUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<HandleAppealRequest>,
) -> Result<Json<OkResponse>, AppError> {
    let appeal_id = require_id(payload.appeal_id, "appeal_id")?;
    let action = parse_review_action(payload.action.as_deref())?;

    let service = ModerationService::new(state.db.clone());
    let found = service
        .handle_appeal(appeal_id, action)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, admin_id = admin.user_id, appeal_id, "failed to handle appeal");
            AppError::internal("failed to handle appeal")
        })?;

    if !found {
        return Err(AppError::not_found("appeal not found"));
    }
    tracing::info!(admin_id = admin.user_id, appeal_id, ?action, "appeal handled");
    Ok(OkResponse::ok())
}

#[derive(Deserialize)]
pub struct AddReleaseRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
}

#[derive(Serialize)]
pub struct ReleaseResponse {
    pub release: Release,
}

pub async fn admin_add_release(
    admin: AdminUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<AddReleaseRequest>,
) -> Result<Json<ReleaseResponse>, AppError> {
    let username = require_text(payload.username, "username")?.to_lowercase();
    let title = require_text(payload.title, "title")?;
    let artist = payload.artist.unwrap_or_default().trim().to_string();
    let cover_url = payload.cover_url.unwrap_or_default().trim().to_string();

    let service = ReleaseService::new(state.db.clone());
    let release = service
        .create(&username, &title, &artist, &cover_url)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, admin_id = admin.user_id, "failed to add release");
            AppError::internal("failed to add release")
        })?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    Ok(Json(ReleaseResponse { release }))
}

pub async fn admin_stats(
    admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<AdminStats>, AppError> {
    let service = ModerationService::new(state.db.clone());
    let stats = service.stats().await.map_err(|err| {
        tracing::error!(error = ?err, admin_id = admin.user_id, "failed to load stats");
        AppError::internal("failed to load stats")
    })?;

    Ok(Json(stats))
}

#[derive(Serialize)]
pub struct ReleasesResponse {
    pub releases: Vec<Release>,
}

pub async fn list_releases(
    State(state): State<AppState>,
    Query(query): Query<UserIdQuery>,
) -> Result<Json<ReleasesResponse>, AppError> {
    let user_id = parse_id_param(query.user_id.as_deref(), "user_id")?;

    let service = ReleaseService::new(state.db.clone());
    let releases = service.for_user(user_id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id, "failed to list releases");
        AppError::internal("failed to list releases")
    })?;

    Ok(Json(ReleasesResponse { releases }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_params_are_validated() {
        assert_eq!(parse_id_param(Some("42"), "id").ok(), Some(42));
        assert!(parse_id_param(None, "id").is_err());
        assert!(parse_id_param(Some(" "), "id").is_err());
        assert!(parse_id_param(Some("abc"), "id").is_err());
    }

    #[test]
    fn page_defaults_to_zero_and_rejects_negatives() {
        assert_eq!(parse_page(None).ok(), Some(0));
        assert_eq!(parse_page(Some("3")).ok(), Some(3));
        assert!(parse_page(Some("-1")).is_err());
        assert!(parse_page(Some("two")).is_err());
    }

    #[test]
    fn text_fields_are_trimmed() {
        assert_eq!(require_text(Some("  hi ".into()), "content").ok(), Some("hi".into()));
        assert!(require_text(Some("   ".into()), "content").is_err());
        assert!(require_text(None, "content").is_err());
    }
}
