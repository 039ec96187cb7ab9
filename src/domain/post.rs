use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::Row;
use time::OffsetDateTime;

/// Select list for a post joined with its author (`u`) and, for reposts, the
/// original post (`op`) and its author (`ou`). Queries must provide all four aliases.
pub const POST_SELECT: &str = "SELECT p.id, p.user_id, p.content, p.media_urls, p.is_repost, \
        p.original_post_id, p.likes_count, p.comments_count, p.reposts_count, p.views_count, \
        p.created_at, \
        u.username, u.display_name, u.avatar_url, u.is_verified, u.is_artist_verified, \
        op.content AS original_content, op.media_urls AS original_media, \
        ou.username AS original_username, ou.display_name AS original_display_name, \
        ou.avatar_url AS original_avatar, ou.is_verified AS original_verified \
     FROM posts p \
     JOIN users u ON p.user_id = u.id \
     LEFT JOIN posts op ON p.original_post_id = op.id \
     LEFT JOIN users ou ON op.user_id = ou.id";

/// WHERE conditions under which the viewer bound at `viewer` may see a row of
/// [`POST_SELECT`]. A repost is visible only when its original is too, so the
/// author rules apply to both `u` and `ou`.
pub fn visible_to(viewer: &str) -> String {
    format!(
        "p.is_removed = FALSE AND u.is_blocked = FALSE AND {} AND {}",
        author_admits("p.user_id", "u", viewer),
        original_visible_to(viewer),
    )
}

/// The repost half of [`visible_to`]: true for plain posts, and for reposts whose
/// original is live and open to the viewer.
pub fn original_visible_to(viewer: &str) -> String {
    format!(
        "(op.id IS NULL OR (op.is_removed = FALSE AND ou.is_blocked = FALSE AND {}))",
        author_admits("op.user_id", "ou", viewer),
    )
}

/// No block in either direction, and a private author only for themselves and active followers.
fn author_admits(author: &str, alias: &str, viewer: &str) -> String {
    format!(
        "({viewer}::BIGINT IS NULL OR NOT EXISTS ( \
             SELECT 1 FROM user_blocks b \
             WHERE (b.blocker_id = {viewer} AND b.blocked_id = {author}) \
                OR (b.blocker_id = {author} AND b.blocked_id = {viewer}))) \
         AND ({alias}.is_private = FALSE OR {author} = {viewer} OR EXISTS ( \
             SELECT 1 FROM follows f \
             WHERE f.follower_id = {viewer} AND f.following_id = {author} AND f.status = 'active'))"
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub content: String,
    pub media_urls: Vec<String>,
    pub is_repost: bool,
    pub original_post_id: Option<i64>,
    pub likes_count: i32,
    pub comments_count: i32,
    pub reposts_count: i32,
    pub views_count: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub username: String,
    pub display_name: String,
    pub avatar_url: String,
    pub is_verified: bool,
    pub is_artist_verified: bool,
    #[serde(flatten)]
    pub original: Option<OriginalPost>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_liked: Option<bool>,
}

/// Content of the post a repost points at.
#[derive(Debug, Clone, Serialize)]
pub struct OriginalPost {
    pub original_content: String,
    pub original_media: Vec<String>,
    pub original_username: String,
    pub original_display_name: String,
    pub original_avatar: String,
    pub original_verified: bool,
}

impl Post {
    /// Decodes a row produced by [`POST_SELECT`].
    pub fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let media: Json<Vec<String>> = row.try_get("media_urls")?;
        let original_media: Option<Json<Vec<String>>> = row.try_get("original_media")?;
        let original_content: Option<String> = row.try_get("original_content")?;

        let original = match (original_content, original_media) {
            (Some(content), Some(media)) => Some(OriginalPost {
                original_content: content,
                original_media: media.0,
                original_username: row.try_get::<Option<String>, _>("original_username")?.unwrap_or_default(),
                original_display_name: row
                    .try_get::<Option<String>, _>("original_display_name")?
                    .unwrap_or_default(),
                original_avatar: row.try_get::<Option<String>, _>("original_avatar")?.unwrap_or_default(),
                original_verified: row.try_get::<Option<bool>, _>("original_verified")?.unwrap_or(false),
            }),
            _ => None,
        };

        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            content: row.try_get("content")?,
            media_urls: media.0,
            is_repost: row.try_get("is_repost")?,
            original_post_id: row.try_get("original_post_id")?,
            likes_count: row.try_get("likes_count")?,
            comments_count: row.try_get("comments_count")?,
            reposts_count: row.try_get("reposts_count")?,
            views_count: row.try_get("views_count")?,
            created_at: row.try_get("created_at")?,
            username: row.try_get("username")?,
            display_name: row.try_get("display_name")?,
            avatar_url: row.try_get("avatar_url")?,
            is_verified: row.try_get("is_verified")?,
            is_artist_verified: row.try_get("is_artist_verified")?,
            original,
            is_liked: None,
        })
    }
}

/// Result of toggling a like on a post.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PostLikeToggle {
    pub liked: bool,
    pub likes_count: i32,
}

/// Marks posts the viewer liked. `liked_ids` comes from a single lookup.
pub fn mark_liked(posts: &mut [Post], liked_ids: &[i64]) {
    for post in posts.iter_mut() {
        post.is_liked = Some(liked_ids.contains(&post.id));
    }
}

/// A post may be created with text, media, or both, but not neither.
pub fn is_empty_post(content: &str, media_urls: &[String]) -> bool {
    content.trim().is_empty() && media_urls.iter().all(|url| url.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: i64) -> Post {
        Post {
            id,
            user_id: 1,
            content: "hello".into(),
            media_urls: vec![],
            is_repost: false,
            original_post_id: None,
            likes_count: 0,
            comments_count: 0,
            reposts_count: 0,
            views_count: 0,
            created_at: OffsetDateTime::UNIX_EPOCH,
            username: "alice".into(),
            display_name: "Alice".into(),
            avatar_url: String::new(),
            is_verified: false,
            is_artist_verified: false,
            original: None,
            is_liked: None,
        }
    }

    #[test]
    fn empty_post_detection() {
        assert!(is_empty_post("   ", &[]));
        assert!(is_empty_post("", &["  ".to_string()]));
        assert!(!is_empty_post("hi", &[]));
        assert!(!is_empty_post("", &["https://cdn/x.jpg".to_string()]));
    }

    #[test]
    fn mark_liked_sets_flag_for_every_post() {
        let mut posts = vec![post(1), post(2), post(3)];
        mark_liked(&mut posts, &[2]);
        let flags: Vec<_> = posts.iter().map(|p| p.is_liked).collect();
        assert_eq!(flags, vec![Some(false), Some(true), Some(false)]);
    }

    #[test]
    fn visibility_covers_repost_original() {
        let clause = visible_to("$3");
        assert!(clause.contains("u.is_private"));
        assert!(clause.contains("ou.is_private"));
        assert!(clause.contains("b.blocked_id = op.user_id"));
        assert!(clause.contains("$3::BIGINT IS NULL"));
        assert!(!clause.contains("$1"));
    }

    #[test]
    fn original_fields_flatten_into_post() {
        let mut repost = post(10);
        repost.is_repost = true;
        repost.original_post_id = Some(1);
        repost.original = Some(OriginalPost {
            original_content: "first".into(),
            original_media: vec![],
            original_username: "bob".into(),
            original_display_name: "Bob".into(),
            original_avatar: String::new(),
            original_verified: true,
        });

        let value = serde_json::to_value(&repost).expect("serializes");
        assert_eq!(value["original_content"], "first");
        assert_eq!(value["original_username"], "bob");
        assert!(value.get("is_liked").is_none());
    }
}
