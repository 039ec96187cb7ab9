use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::OffsetDateTime;

pub const MAX_COMMENT_LEN: usize = 2000;

/// Select list for a comment joined with its author as `u`.
pub const COMMENT_SELECT: &str = "SELECT c.id, c.post_id, c.user_id, c.parent_id, c.content, \
        c.likes_count, c.is_pinned, c.is_author_liked, c.created_at, \
        u.username, u.display_name, u.avatar_url, u.is_verified, u.is_artist_verified \
     FROM comments c \
     JOIN users u ON c.user_id = u.id";

#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub parent_id: Option<i64>,
    pub content: String,
    pub likes_count: i32,
    pub is_pinned: bool,
    pub is_author_liked: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub username: String,
    pub display_name: String,
    pub avatar_url: String,
    pub is_verified: bool,
    pub is_artist_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_liked: Option<bool>,
}

impl Comment {
    pub fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            post_id: row.try_get("post_id")?,
            user_id: row.try_get("user_id")?,
            parent_id: row.try_get("parent_id")?,
            content: row.try_get("content")?,
            likes_count: row.try_get("likes_count")?,
            is_pinned: row.try_get("is_pinned")?,
            is_author_liked: row.try_get("is_author_liked")?,
            created_at: row.try_get("created_at")?,
            username: row.try_get("username")?,
            display_name: row.try_get("display_name")?,
            avatar_url: row.try_get("avatar_url")?,
            is_verified: row.try_get("is_verified")?,
            is_artist_verified: row.try_get("is_artist_verified")?,
            is_liked: None,
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CommentLikeToggle {
    pub liked: bool,
    pub likes_count: i32,
    pub is_author_liked: bool,
}

/// The "liked by author" badge follows the post owner's like on someone else's
/// comment. Likes from anyone else leave it unchanged.
pub fn author_liked_after_toggle(
    current: bool,
    liker_id: i64,
    post_owner_id: i64,
    comment_author_id: i64,
    liked: bool,
) -> bool {
    if liker_id == post_owner_id && comment_author_id != post_owner_id {
        liked
    } else {
        current
    }
}

/// Who may take a comment down.
pub fn can_remove_comment(
    caller_id: i64,
    caller_is_admin: bool,
    comment_author_id: i64,
    post_owner_id: i64,
) -> bool {
    caller_is_admin || caller_id == comment_author_id || caller_id == post_owner_id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_owner_like_sets_badge() {
        assert!(author_liked_after_toggle(false, 1, 1, 2, true));
    }

    #[test]
    fn post_owner_unlike_clears_badge() {
        assert!(!author_liked_after_toggle(true, 1, 1, 2, false));
    }

    #[test]
    fn other_likers_do_not_touch_badge() {
        assert!(!author_liked_after_toggle(false, 3, 1, 2, true));
        assert!(author_liked_after_toggle(true, 3, 1, 2, false));
    }

    #[test]
    fn owner_liking_own_comment_is_not_a_badge() {
        assert!(!author_liked_after_toggle(false, 1, 1, 1, true));
    }

    #[test]
    fn comment_removal_rights() {
        assert!(can_remove_comment(2, false, 2, 1));
        assert!(can_remove_comment(1, false, 2, 1));
        assert!(can_remove_comment(9, true, 2, 1));
        assert!(!can_remove_comment(9, false, 2, 1));
    }
}
