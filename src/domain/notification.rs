use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Like,
    Comment,
    Repost,
    Follow,
    FollowRequest,
    FollowAccepted,
    Message,
}

impl NotificationKind {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Comment => "comment",
            Self::Repost => "repost",
            Self::Follow => "follow",
            Self::FollowRequest => "follow_request",
            Self::FollowAccepted => "follow_accepted",
            Self::Message => "message",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub from_user_id: i64,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub post_id: Option<i64>,
    pub comment_id: Option<i64>,
    pub is_read: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub username: String,
    pub display_name: String,
    pub avatar_url: String,
}

impl Notification {
    pub fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            from_user_id: row.try_get("from_user_id")?,
            notification_type: row.try_get("type")?,
            post_id: row.try_get("post_id")?,
            comment_id: row.try_get("comment_id")?,
            is_read: row.try_get("is_read")?,
            created_at: row.try_get("created_at")?,
            username: row.try_get("username")?,
            display_name: row.try_get("display_name")?,
            avatar_url: row.try_get("avatar_url")?,
        })
    }
}

/// A user waiting on the caller to accept a follow request.
#[derive(Debug, Clone, Serialize)]
pub struct PendingRequest {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub avatar_url: String,
}
