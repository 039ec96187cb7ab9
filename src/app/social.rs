use anyhow::Result;

use crate::app::access::{AccessService, Listing};
use crate::app::notifications::{NewNotification, NotificationService};
use crate::domain::notification::NotificationKind;
use crate::domain::social_graph::{FollowRequestAction, FollowStatus};
use crate::domain::user::UserSummary;
use crate::infra::db::Db;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Status(FollowStatus),
    NotFound,
    Blocked,
}

/// Which side of the follow graph to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connection {
    Followers,
    Following,
    Friends,
}

impl Connection {
    fn query(&self) -> &'static str {
        match self {
            Self::Followers => {
                "SELECT u.id, u.username, u.display_name, u.avatar_url, u.is_verified, u.is_artist_verified \
                 FROM follows f \
                 JOIN users u ON u.id = f.follower_id \
                 WHERE f.following_id = $1 AND f.status = 'active' AND u.is_blocked = FALSE \
                 ORDER BY f.created_at DESC, f.id DESC"
            }
            Self::Following => {
                "SELECT u.id, u.username, u.display_name, u.avatar_url, u.is_verified, u.is_artist_verified \
                 FROM follows f \
                 JOIN users u ON u.id = f.following_id \
                 WHERE f.follower_id = $1 AND f.status = 'active' AND u.is_blocked = FALSE \
                 ORDER BY f.created_at DESC, f.id DESC"
            }
            Self::Friends => {
                "SELECT u.id, u.username, u.display_name, u.avatar_url, u.is_verified, u.is_artist_verified \
                 FROM follows f \
                 JOIN follows back ON back.follower_id = f.following_id \
                                  AND back.following_id = f.follower_id \
                                  AND back.status = 'active' \
                 JOIN users u ON u.id = f.following_id \
                 WHERE f.follower_id = $1 AND f.status = 'active' AND u.is_blocked = FALSE \
                 ORDER BY f.created_at DESC, f.id DESC"
            }
        }
    }
}

#[derive(Clone)]
pub struct SocialService {
    db: Db,
}

impl SocialService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Live `pending`/`active` edges are returned unchanged; anything else is (re)requested.
    pub async fn follow(&self, follower_id: i64, target_id: i64) -> Result<FollowOutcome> {
        let mut tx = self.db.pool().begin().await?;

        let is_private: Option<bool> = sqlx::query_scalar(
            "SELECT is_private FROM users WHERE id = $1 AND is_blocked = FALSE FOR UPDATE",
        )
        .bind(target_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(is_private) = is_private else {
            tx.rollback().await?;
            return Ok(FollowOutcome::NotFound);
        };

        let blocked: bool = sqlx::query_scalar(
            "SELECT EXISTS ( \
                 SELECT 1 FROM user_blocks \
                 WHERE (blocker_id = $1 AND blocked_id = $2) \
                    OR (blocker_id = $2 AND blocked_id = $1) \
             )",
        )
        .bind(follower_id)
        .bind(target_id)
        .fetch_one(&mut *tx)
        .await?;
        if blocked {
            tx.rollback().await?;
            return Ok(FollowOutcome::Blocked);
        }

        let existing: Option<String> = sqlx::query_scalar(
            "SELECT status FROM follows WHERE follower_id = $1 AND following_id = $2",
        )
        .bind(follower_id)
        .bind(target_id)
        .fetch_optional(&mut *tx)
        .await?;
        if let Some(status) = existing.as_deref().and_then(FollowStatus::from_db) {
            if !status.is_terminal() {
                tx.rollback().await?;
                return Ok(FollowOutcome::Status(status));
            }
        }

        let status = FollowStatus::initial_for(is_private);
        sqlx::query(
            "INSERT INTO follows (follower_id, following_id, status) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (follower_id, following_id) \
             DO UPDATE SET status = EXCLUDED.status, created_at = now()",
        )
        .bind(follower_id)
        .bind(target_id)
        .bind(status.as_db())
        .execute(&mut *tx)
        .await?;

        let kind = match status {
            FollowStatus::Pending => NotificationKind::FollowRequest,
            _ => NotificationKind::Follow,
        };
        NotificationService::notify_with_tx(NewNotification::new(target_id, follower_id, kind), &mut tx)
            .await?;

        tx.commit().await?;
        Ok(FollowOutcome::Status(status))
    }

    pub async fn unfollow(&self, follower_id: i64, target_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE follows SET status = 'removed' \
             WHERE follower_id = $1 AND following_id = $2 AND status <> 'removed'",
        )
        .bind(follower_id)
        .bind(target_id)
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Resolves a pending request from `requester_id`. Returns false when nothing was pending.
    pub async fn respond_to_request(
        &self,
        user_id: i64,
        requester_id: i64,
        action: FollowRequestAction,
    ) -> Result<bool> {
        let status = match action {
            FollowRequestAction::Accept => FollowStatus::Active,
            FollowRequestAction::Reject => FollowStatus::Rejected,
        };

        let mut tx = self.db.pool().begin().await?;
        let result = sqlx::query(
            "UPDATE follows SET status = $3 \
             WHERE follower_id = $1 AND following_id = $2 AND status = 'pending'",
        )
        .bind(requester_id)
        .bind(user_id)
        .bind(status.as_db())
        .execute(&mut *tx)
        .await?;

        let changed = result.rows_affected() > 0;
        if changed && action == FollowRequestAction::Accept {
            NotificationService::notify_with_tx(
                NewNotification::new(requester_id, user_id, NotificationKind::FollowAccepted),
                &mut tx,
            )
            .await?;
        }

        tx.commit().await?;
        Ok(changed)
    }

    pub async fn list(
        &self,
        viewer_id: Option<i64>,
        user_id: i64,
        connection: Connection,
    ) -> Result<Listing<UserSummary>> {
        let access = AccessService::new(self.db.clone());
        let Some(settings) = access.privacy_settings(user_id).await? else {
            return Ok(Listing::visible(Vec::new()));
        };
        let audience = match connection {
            Connection::Followers => settings.show_followers,
            Connection::Following => settings.show_following,
            Connection::Friends => settings.show_friends,
        };
        if !access.list_visible_to(audience, viewer_id, user_id).await? {
            return Ok(Listing::hidden());
        }

        let rows = sqlx::query(connection.query())
            .bind(user_id)
            .fetch_all(self.db.pool())
            .await?;
        let users = rows.iter().map(UserSummary::from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(Listing::visible(users))
    }

    /// Idempotent. Drops follow edges in both directions.
    pub async fn block(&self, blocker_id: i64, blocked_id: i64) -> Result<bool> {
        let mut tx = self.db.pool().begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO user_blocks (blocker_id, blocked_id) \
             SELECT $1, $2 \
             WHERE EXISTS (SELECT 1 FROM users WHERE id = $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(blocker_id)
        .bind(blocked_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "DELETE FROM follows \
             WHERE (follower_id = $1 AND following_id = $2) \
                OR (follower_id = $2 AND following_id = $1)",
        )
        .bind(blocker_id)
        .bind(blocked_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(inserted.rows_affected() > 0)
    }

    pub async fn unblock(&self, blocker_id: i64, blocked_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM user_blocks WHERE blocker_id = $1 AND blocked_id = $2",
        )
        .bind(blocker_id)
        .bind(blocked_id)
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
