use anyhow::Result;
use sqlx::types::Json;
use sqlx::Row;

use crate::domain::privacy::{Audience, PrivacySettings};
use crate::domain::social_graph::FollowStatus;
use crate::infra::db::Db;

/// Account state consulted by the auth extractors and the blocked-account gate.
#[derive(Debug, Clone)]
pub struct AccountState {
    pub user_id: i64,
    pub is_admin: bool,
    pub is_blocked: bool,
    pub block_reason: String,
}

/// Result of an ownership-checked removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotFound,
    Forbidden,
}

/// A list whose owner may have hidden it from the viewer.
#[derive(Debug, Clone)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub hidden: bool,
}

impl<T> Listing<T> {
    pub fn visible(items: Vec<T>) -> Self {
        Self {
            items,
            hidden: false,
        }
    }

    pub fn hidden() -> Self {
        Self {
            items: Vec::new(),
            hidden: true,
        }
    }
}

#[derive(Clone)]
pub struct AccessService {
    db: Db,
}

impl AccessService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn account_state(&self, user_id: i64) -> Result<Option<AccountState>> {
        let row = sqlx::query(
            "SELECT id, is_admin, is_blocked, block_reason FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(AccountState {
            user_id: row.try_get("id")?,
            is_admin: row.try_get("is_admin")?,
            is_blocked: row.try_get("is_blocked")?,
            block_reason: row.try_get("block_reason")?,
        }))
    }

    pub async fn is_admin(&self, user_id: i64) -> Result<bool> {
        let is_admin: Option<bool> =
            sqlx::query_scalar("SELECT is_admin FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(self.db.pool())
                .await?;
        Ok(is_admin.unwrap_or(false))
    }

    /// True when either user has blocked the other.
    pub async fn is_blocked_between(&self, a: i64, b: i64) -> Result<bool> {
        let blocked: bool = sqlx::query_scalar(
            "SELECT EXISTS ( \
                 SELECT 1 FROM user_blocks \
                 WHERE (blocker_id = $1 AND blocked_id = $2) \
                    OR (blocker_id = $2 AND blocked_id = $1) \
             )",
        )
        .bind(a)
        .bind(b)
        .fetch_one(self.db.pool())
        .await?;
        Ok(blocked)
    }

    pub async fn has_blocked(&self, blocker_id: i64, blocked_id: i64) -> Result<bool> {
        let blocked: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM user_blocks WHERE blocker_id = $1 AND blocked_id = $2)",
        )
        .bind(blocker_id)
        .bind(blocked_id)
        .fetch_one(self.db.pool())
        .await?;
        Ok(blocked)
    }

    pub async fn follow_status(
        &self,
        follower_id: i64,
        following_id: i64,
    ) -> Result<Option<FollowStatus>> {
        let status: Option<String> = sqlx::query_scalar(
            "SELECT status FROM follows WHERE follower_id = $1 AND following_id = $2",
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(status.as_deref().and_then(FollowStatus::from_db))
    }

    pub async fn follows_active(&self, follower_id: i64, following_id: i64) -> Result<bool> {
        Ok(self.follow_status(follower_id, following_id).await? == Some(FollowStatus::Active))
    }

    pub async fn privacy_settings(&self, user_id: i64) -> Result<Option<PrivacySettings>> {
        let settings: Option<Json<PrivacySettings>> =
            sqlx::query_scalar("SELECT privacy_settings FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(self.db.pool())
                .await?;
        Ok(settings.map(|settings| settings.0))
    }

    /// Evaluates an owner's audience for the viewer, looking up the follow edge only when needed.
    pub async fn audience_admits(
        &self,
        audience: Audience,
        viewer_id: Option<i64>,
        owner_id: i64,
    ) -> Result<bool> {
        let follows = match viewer_id {
            Some(viewer) if audience.needs_follow_state() && viewer != owner_id => {
                self.follows_active(viewer, owner_id).await?
            }
            _ => false,
        };
        Ok(audience.permits(viewer_id, owner_id, follows))
    }

    /// Gate for an owner's lists (likes, reposts, connections). A block in either direction hides them.
    pub async fn list_visible_to(
        &self,
        audience: Audience,
        viewer_id: Option<i64>,
        owner_id: i64,
    ) -> Result<bool> {
        if let Some(viewer) = viewer_id {
            if viewer != owner_id && self.is_blocked_between(viewer, owner_id).await? {
                return Ok(false);
            }
        }
        self.audience_admits(audience, viewer_id, owner_id).await
    }
}

/// Public accounts are open to everyone; private ones to the owner and active followers.
pub fn can_view_profile_content(
    viewer_id: Option<i64>,
    owner_id: i64,
    is_private: bool,
    follows_active: bool,
) -> bool {
    if !is_private || viewer_id == Some(owner_id) {
        return true;
    }
    viewer_id.is_some() && follows_active
}

pub fn can_remove_post(caller_id: i64, caller_is_admin: bool, author_id: i64) -> bool {
    caller_is_admin || caller_id == author_id
}
