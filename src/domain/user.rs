use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::Row;
use time::OffsetDateTime;

use crate::domain::privacy::PrivacySettings;
use crate::domain::social_graph::FollowStatus;

/// Columns selected for [`User`]; callers prefix nothing, the table is `users`.
pub const USER_COLUMNS: &str = "id, username, email, display_name, bio, avatar_url, avatars, links, \
     privacy_settings, theme, role, is_private, is_verified, is_artist_verified, is_admin, \
     is_blocked, block_reason, created_at";

/// The account as its owner sees it.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub bio: String,
    pub avatar_url: String,
    pub avatars: Vec<String>,
    pub links: Value,
    pub privacy_settings: PrivacySettings,
    pub theme: String,
    pub role: String,
    pub is_private: bool,
    pub is_verified: bool,
    pub is_artist_verified: bool,
    pub is_admin: bool,
    pub is_blocked: bool,
    pub block_reason: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl User {
    pub fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let avatars: Json<Vec<String>> = row.try_get("avatars")?;
        let links: Json<Value> = row.try_get("links")?;
        let privacy: Json<PrivacySettings> = row.try_get("privacy_settings")?;
        Ok(Self {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            display_name: row.try_get("display_name")?,
            bio: row.try_get("bio")?,
            avatar_url: row.try_get("avatar_url")?,
            avatars: avatars.0,
            links: links.0,
            privacy_settings: privacy.0,
            theme: row.try_get("theme")?,
            role: row.try_get("role")?,
            is_private: row.try_get("is_private")?,
            is_verified: row.try_get("is_verified")?,
            is_artist_verified: row.try_get("is_artist_verified")?,
            is_admin: row.try_get("is_admin")?,
            is_blocked: row.try_get("is_blocked")?,
            block_reason: row.try_get("block_reason")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Author/actor fields attached to lists of users, posts and comments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub avatar_url: String,
    pub is_verified: bool,
    pub is_artist_verified: bool,
}

impl UserSummary {
    pub fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            display_name: row.try_get("display_name")?,
            avatar_url: row.try_get("avatar_url")?,
            is_verified: row.try_get("is_verified")?,
            is_artist_verified: row.try_get("is_artist_verified")?,
        })
    }
}

/// Public profile page. Viewer-dependent fields are only present for signed-in viewers.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub bio: String,
    pub avatar_url: String,
    pub avatars: Vec<String>,
    pub links: Value,
    pub privacy_settings: PrivacySettings,
    pub role: String,
    pub is_private: bool,
    pub is_verified: bool,
    pub is_artist_verified: bool,
    pub is_admin: bool,
    pub is_blocked: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub followers_count: i64,
    pub following_count: i64,
    pub posts_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_status: Option<ProfileFollowStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_blocked_by_me: Option<bool>,
    pub can_see_posts: bool,
}

impl Profile {
    pub fn from_user(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            display_name: user.display_name,
            bio: user.bio,
            avatar_url: user.avatar_url,
            avatars: user.avatars,
            links: user.links,
            privacy_settings: user.privacy_settings,
            role: user.role,
            is_private: user.is_private,
            is_verified: user.is_verified,
            is_artist_verified: user.is_artist_verified,
            is_admin: user.is_admin,
            is_blocked: user.is_blocked,
            created_at: user.created_at,
            followers_count: 0,
            following_count: 0,
            posts_count: 0,
            follow_status: None,
            is_blocked_by_me: None,
            can_see_posts: false,
        }
    }
}

/// `none` when the viewer has never followed, otherwise the edge's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileFollowStatus {
    None,
    Pending,
    Active,
    Rejected,
    Removed,
}

impl From<Option<FollowStatus>> for ProfileFollowStatus {
    fn from(status: Option<FollowStatus>) -> Self {
        match status {
            None => Self::None,
            Some(FollowStatus::Pending) => Self::Pending,
            Some(FollowStatus::Active) => Self::Active,
            Some(FollowStatus::Rejected) => Self::Rejected,
            Some(FollowStatus::Removed) => Self::Removed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Theme {
    DarkGreen,
    DarkBlue,
    Crystal,
    WhiteYellow,
}

impl Theme {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "dark-green" => Some(Self::DarkGreen),
            "dark-blue" => Some(Self::DarkBlue),
            "crystal" => Some(Self::Crystal),
            "white-yellow" => Some(Self::WhiteYellow),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::DarkGreen => "dark-green",
            Self::DarkBlue => "dark-blue",
            Self::Crystal => "crystal",
            Self::WhiteYellow => "white-yellow",
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::DarkGreen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_round_trips_through_db_names() {
        for theme in [Theme::DarkGreen, Theme::DarkBlue, Theme::Crystal, Theme::WhiteYellow] {
            assert_eq!(Theme::from_db(theme.as_db()), Some(theme));
        }
        assert_eq!(Theme::from_db("neon"), None);
    }

    #[test]
    fn follow_status_defaults_to_none() {
        assert_eq!(ProfileFollowStatus::from(None), ProfileFollowStatus::None);
        assert_eq!(
            ProfileFollowStatus::from(Some(FollowStatus::Pending)),
            ProfileFollowStatus::Pending
        );
    }
}
