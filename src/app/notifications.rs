use anyhow::Result;
use sqlx::{Postgres, Row, Transaction};

use crate::domain::notification::{Notification, NotificationKind, PendingRequest};
use crate::infra::db::Db;

const NOTIFICATION_LIMIT: i64 = 50;

#[derive(Debug, Clone, Copy)]
pub struct NewNotification {
    pub user_id: i64,
    pub from_user_id: i64,
    pub kind: NotificationKind,
    pub post_id: Option<i64>,
    pub comment_id: Option<i64>,
}

impl NewNotification {
    pub fn new(user_id: i64, from_user_id: i64, kind: NotificationKind) -> Self {
        Self {
            user_id,
            from_user_id,
            kind,
            post_id: None,
            comment_id: None,
        }
    }

    pub fn with_post(mut self, post_id: i64) -> Self {
        self.post_id = Some(post_id);
        self
    }

    pub fn with_comment(mut self, comment_id: i64) -> Self {
        self.comment_id = Some(comment_id);
        self
    }
}

#[derive(Clone)]
pub struct NotificationService {
    db: Db,
}

impl NotificationService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Writes the notification inside the caller's transaction. Self-notifications are skipped.
    pub async fn notify_with_tx(
        notification: NewNotification,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<()> {
        if notification.user_id == notification.from_user_id {
            return Ok(());
        }

        sqlx::query(
            "INSERT INTO notifications (user_id, from_user_id, type, post_id, comment_id) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(notification.user_id)
        .bind(notification.from_user_id)
        .bind(notification.kind.as_db())
        .bind(notification.post_id)
        .bind(notification.comment_id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    pub async fn list(&self, user_id: i64) -> Result<(Vec<Notification>, Vec<PendingRequest>)> {
        let rows = sqlx::query(
            "SELECT n.id, n.user_id, n.from_user_id, n.type, n.post_id, n.comment_id, \
                    n.is_read, n.created_at, u.username, u.display_name, u.avatar_url \
             FROM notifications n \
             JOIN users u ON u.id = n.from_user_id \
             WHERE n.user_id = $1 \
             ORDER BY n.created_at DESC, n.id DESC \
             LIMIT $2",
        )
        .bind(user_id)
        .bind(NOTIFICATION_LIMIT)
        .fetch_all(self.db.pool())
        .await?;

        let notifications = rows
            .iter()
            .map(Notification::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let rows = sqlx::query(
            "SELECT u.id, u.username, u.display_name, u.avatar_url \
             FROM follows f \
             JOIN users u ON u.id = f.follower_id \
             WHERE f.following_id = $1 AND f.status = 'pending' \
             ORDER BY f.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;

        let mut pending = Vec::with_capacity(rows.len());
        for row in rows {
            pending.push(PendingRequest {
                id: row.try_get("id")?,
                username: row.try_get("username")?,
                display_name: row.try_get("display_name")?,
                avatar_url: row.try_get("avatar_url")?,
            });
        }

        Ok((notifications, pending))
    }

    pub async fn mark_all_read(&self, user_id: i64) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected())
    }
}
