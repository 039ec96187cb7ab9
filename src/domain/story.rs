use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryVisibility {
    All,
    Followers,
    Mutual,
}

impl StoryVisibility {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "all" => Some(Self::All),
            "followers" => Some(Self::Followers),
            "mutual" => Some(Self::Mutual),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Followers => "followers",
            Self::Mutual => "mutual",
        }
    }

    /// `follows` is viewer -> owner, `followed_back` is owner -> viewer; both active.
    pub fn permits(
        &self,
        viewer_id: Option<i64>,
        owner_id: i64,
        follows: bool,
        followed_back: bool,
    ) -> bool {
        match (self, viewer_id) {
            (Self::All, _) => true,
            (_, None) => false,
            (_, Some(viewer)) if viewer == owner_id => true,
            (Self::Followers, Some(_)) => follows,
            (Self::Mutual, Some(_)) => follows && followed_back,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Story {
    pub id: i64,
    pub user_id: i64,
    pub media_url: String,
    pub visibility: StoryVisibility,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub username: String,
    pub display_name: String,
    pub avatar_url: String,
    pub is_verified: bool,
    pub views_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_viewed: Option<bool>,
}

impl Story {
    pub fn from_row(row: &PgRow) -> anyhow::Result<Self> {
        let visibility: String = row.try_get("visibility")?;
        let visibility = StoryVisibility::from_db(&visibility)
            .ok_or_else(|| anyhow::anyhow!("unknown story visibility: {}", visibility))?;

        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            media_url: row.try_get("media_url")?,
            visibility,
            created_at: row.try_get("created_at")?,
            expires_at: row.try_get("expires_at")?,
            username: row.try_get("username")?,
            display_name: row.try_get("display_name")?,
            avatar_url: row.try_get("avatar_url")?,
            is_verified: row.try_get("is_verified")?,
            views_count: row.try_get("views_count")?,
            is_viewed: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_is_public() {
        assert!(StoryVisibility::All.permits(None, 1, false, false));
        assert!(StoryVisibility::All.permits(Some(2), 1, false, false));
    }

    #[test]
    fn anonymous_sees_only_public() {
        assert!(!StoryVisibility::Followers.permits(None, 1, false, false));
        assert!(!StoryVisibility::Mutual.permits(None, 1, false, false));
    }

    #[test]
    fn owner_sees_own_restricted_stories() {
        assert!(StoryVisibility::Followers.permits(Some(1), 1, false, false));
        assert!(StoryVisibility::Mutual.permits(Some(1), 1, false, false));
    }

    #[test]
    fn followers_need_active_follow() {
        assert!(StoryVisibility::Followers.permits(Some(2), 1, true, false));
        assert!(!StoryVisibility::Followers.permits(Some(2), 1, false, true));
    }

    #[test]
    fn mutual_needs_both_directions() {
        assert!(StoryVisibility::Mutual.permits(Some(2), 1, true, true));
        assert!(!StoryVisibility::Mutual.permits(Some(2), 1, true, false));
        assert!(!StoryVisibility::Mutual.permits(Some(2), 1, false, true));
    }
}
