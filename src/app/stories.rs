use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::domain::story::{Story, StoryVisibility};
use crate::infra::db::Db;

#[derive(Clone)]
pub struct StoryService {
    db: Db,
}

impl StoryService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Unexpired stories the viewer may see, newest first.
    pub async fn list(&self, viewer_id: Option<i64>) -> Result<Vec<Story>> {
        let rows = sqlx::query(&format!(
            "{} ORDER BY s.created_at DESC, s.id DESC",
            LIVE_STORY_SELECT
        ))
        .bind(viewer_id)
        .fetch_all(self.db.pool())
        .await?;

        let mut stories = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(story) = permitted_story(&row, viewer_id)? {
                stories.push(story);
            }
        }
        Ok(stories)
    }

    pub async fn create(
        &self,
        user_id: i64,
        media_url: &str,
        visibility: StoryVisibility,
        ttl_hours: i64,
    ) -> Result<Story> {
        let row = sqlx::query(
            "WITH s AS ( \
                 INSERT INTO stories (user_id, media_url, visibility, expires_at) \
                 VALUES ($1, $2, $3, now() + make_interval(hours => $4::INT)) \
                 RETURNING id, user_id, media_url, visibility, created_at, expires_at \
             ) \
             SELECT s.id, s.user_id, s.media_url, s.visibility, s.created_at, s.expires_at, \
                    u.username, u.display_name, u.avatar_url, u.is_verified, \
                    0::BIGINT AS views_count \
             FROM s JOIN users u ON u.id = s.user_id",
        )
        .bind(user_id)
        .bind(media_url)
        .bind(visibility.as_db())
        .bind(ttl_hours)
        .fetch_one(self.db.pool())
        .await?;

        Story::from_row(&row)
    }

    /// Idempotent. Returns false when the story does not exist, expired, or is hidden from the viewer.
    pub async fn record_view(&self, viewer_id: i64, story_id: i64) -> Result<bool> {
        let row = sqlx::query(&format!("{} AND s.id = $2", LIVE_STORY_SELECT))
            .bind(Some(viewer_id))
            .bind(story_id)
            .fetch_optional(self.db.pool())
            .await?;
        let Some(row) = row else {
            return Ok(false);
        };
        if permitted_story(&row, Some(viewer_id))?.is_none() {
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO story_views (story_id, viewer_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(story_id)
        .bind(viewer_id)
        .execute(self.db.pool())
        .await?;
        Ok(true)
    }
}

/// Unexpired stories of active authors with no block either way. Binds the viewer as `$1`.
const LIVE_STORY_SELECT: &str = "SELECT s.id, s.user_id, s.media_url, s.visibility, s.created_at, s.expires_at, \
        u.username, u.display_name, u.avatar_url, u.is_verified, \
        (SELECT COUNT(*) FROM story_views sv WHERE sv.story_id = s.id) AS views_count, \
        EXISTS ( \
            SELECT 1 FROM follows f \
            WHERE f.follower_id = $1 AND f.following_id = s.user_id AND f.status = 'active' \
        ) AS viewer_follows, \
        EXISTS ( \
            SELECT 1 FROM follows f \
            WHERE f.follower_id = s.user_id AND f.following_id = $1 AND f.status = 'active' \
        ) AS followed_back, \
        EXISTS ( \
            SELECT 1 FROM story_views sv WHERE sv.story_id = s.id AND sv.viewer_id = $1 \
        ) AS viewed \
     FROM stories s \
     JOIN users u ON u.id = s.user_id \
     WHERE s.expires_at > now() \
       AND u.is_blocked = FALSE \
       AND ($1::BIGINT IS NULL OR NOT EXISTS ( \
           SELECT 1 FROM user_blocks b \
           WHERE (b.blocker_id = $1 AND b.blocked_id = s.user_id) \
              OR (b.blocker_id = s.user_id AND b.blocked_id = $1) \
       ))";

/// Applies the story's audience to a [`LIVE_STORY_SELECT`] row.
fn permitted_story(row: &PgRow, viewer_id: Option<i64>) -> Result<Option<Story>> {
    let mut story = Story::from_row(row)?;
    let follows: bool = row.try_get("viewer_follows")?;
    let followed_back: bool = row.try_get("followed_back")?;
    if !story
        .visibility
        .permits(viewer_id, story.user_id, follows, followed_back)
    {
        return Ok(None);
    }
    if viewer_id.is_some() {
        story.is_viewed = Some(row.try_get("viewed")?);
    }
    Ok(Some(story))
}

/// Parses the optional visibility field; absent means `all`.
pub fn parse_visibility(value: Option<&str>) -> Option<StoryVisibility> {
    match value.map(str::trim) {
        None | Some("") => Some(StoryVisibility::All),
        Some(value) => StoryVisibility::from_db(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_defaults_to_all() {
        assert_eq!(parse_visibility(None), Some(StoryVisibility::All));
        assert_eq!(parse_visibility(Some("")), Some(StoryVisibility::All));
    }

    #[test]
    fn visibility_rejects_unknown_values() {
        assert_eq!(parse_visibility(Some("mutual")), Some(StoryVisibility::Mutual));
        assert_eq!(parse_visibility(Some("friends")), None);
    }
}
