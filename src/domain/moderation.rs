use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::OffsetDateTime;

pub const DEFAULT_BLOCK_REASON: &str = "violation of community rules";
pub const REPORT_BLOCK_REASON: &str = "removed after report";
pub const SELF_REMOVAL_REASON: &str = "account removed by owner";

/// Admin decision on a pending report, verification request or appeal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    Accept,
    Reject,
}

impl ReviewAction {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "accept" => Some(Self::Accept),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }

    /// Status the reviewed row is left in.
    pub fn resolved_status(&self) -> &'static str {
        match self {
            Self::Accept => "accepted",
            Self::Reject => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationKind {
    Standard,
    Artist,
}

impl VerificationKind {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "standard" => Some(Self::Standard),
            "artist" => Some(Self::Artist),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Artist => "artist",
        }
    }

    /// Users column set when a request of this kind is accepted.
    pub fn badge_column(&self) -> &'static str {
        match self {
            Self::Standard => "is_verified",
            Self::Artist => "is_artist_verified",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportView {
    pub id: i64,
    pub reporter_id: i64,
    pub reported_user_id: Option<i64>,
    pub reported_post_id: Option<i64>,
    pub reason: String,
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub reporter_username: Option<String>,
    pub reported_username: Option<String>,
    pub post_content: Option<String>,
}

impl ReportView {
    pub fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            reporter_id: row.try_get("reporter_id")?,
            reported_user_id: row.try_get("reported_user_id")?,
            reported_post_id: row.try_get("reported_post_id")?,
            reason: row.try_get("reason")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            reporter_username: row.try_get("reporter_username")?,
            reported_username: row.try_get("reported_username")?,
            post_content: row.try_get("post_content")?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VerificationRequestView {
    pub id: i64,
    pub user_id: i64,
    #[serde(rename = "type")]
    pub kind: VerificationKind,
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub username: String,
    pub display_name: String,
    pub avatar_url: String,
}

impl VerificationRequestView {
    pub fn from_row(row: &PgRow) -> anyhow::Result<Self> {
        let kind: String = row.try_get("type")?;
        let kind = VerificationKind::from_db(&kind)
            .ok_or_else(|| anyhow::anyhow!("unknown verification type: {}", kind))?;
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            kind,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            username: row.try_get("username")?,
            display_name: row.try_get("display_name")?,
            avatar_url: row.try_get("avatar_url")?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AppealView {
    pub id: i64,
    pub user_id: i64,
    pub reason: String,
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub username: String,
    pub display_name: String,
    pub avatar_url: String,
}

impl AppealView {
    pub fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            reason: row.try_get("reason")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            username: row.try_get("username")?,
            display_name: row.try_get("display_name")?,
            avatar_url: row.try_get("avatar_url")?,
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct AdminStats {
    pub users: i64,
    pub posts: i64,
    pub reports: i64,
    pub verifications: i64,
    pub appeals: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_action_parsing_is_strict() {
        assert_eq!(ReviewAction::parse("accept"), Some(ReviewAction::Accept));
        assert_eq!(ReviewAction::parse(" reject "), Some(ReviewAction::Reject));
        assert_eq!(ReviewAction::parse("approve"), None);
        assert_eq!(ReviewAction::parse(""), None);
    }

    #[test]
    fn verification_badges() {
        assert_eq!(VerificationKind::Standard.badge_column(), "is_verified");
        assert_eq!(VerificationKind::Artist.badge_column(), "is_artist_verified");
        assert_eq!(VerificationKind::from_db("vip"), None);
    }
}
