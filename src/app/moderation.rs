use anyhow::Result;
use sqlx::Row;

use crate::domain::moderation::{
    AdminStats, AppealView, ReportView, ReviewAction, VerificationKind, VerificationRequestView,
    REPORT_BLOCK_REASON,
};
use crate::infra::db::Db;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportResolution {
    Resolved { suspended_user_id: Option<i64> },
    NotFound,
}

#[derive(Clone)]
pub struct ModerationService {
    db: Db,
}

impl ModerationService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn report(
        &self,
        reporter_id: i64,
        reason: &str,
        reported_user_id: Option<i64>,
        reported_post_id: Option<i64>,
    ) -> Result<i64> {
        let report_id: i64 = sqlx::query_scalar(
            "INSERT INTO reports (reporter_id, reported_user_id, reported_post_id, reason) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id",
        )
        .bind(reporter_id)
        .bind(reported_user_id)
        .bind(reported_post_id)
        .bind(reason)
        .fetch_one(self.db.pool())
        .await?;
        Ok(report_id)
    }

    /// Returns false when the user already has a pending request.
    pub async fn request_verification(&self, user_id: i64, kind: VerificationKind) -> Result<bool> {
        let mut tx = self.db.pool().begin().await?;

        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;

        let pending: bool = sqlx::query_scalar(
            "SELECT EXISTS ( \
                 SELECT 1 FROM verification_requests WHERE user_id = $1 AND status = 'pending' \
             )",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
        if pending {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("INSERT INTO verification_requests (user_id, type) VALUES ($1, $2)")
            .bind(user_id)
            .bind(kind.as_db())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    pub async fn appeal(&self, user_id: i64, reason: &str) -> Result<i64> {
        let appeal_id: i64 = sqlx::query_scalar(
            "INSERT INTO appeals (user_id, reason) VALUES ($1, $2) RETURNING id",
        )
        .bind(user_id)
        .bind(reason)
        .fetch_one(self.db.pool())
        .await?;
        Ok(appeal_id)
    }

    /// Suspends the account by username. Returns the user id so its tokens can be revoked.
    pub async fn suspend_by_username(&self, username: &str, reason: &str) -> Result<Option<i64>> {
        let user_id: Option<i64> = sqlx::query_scalar(
            "UPDATE users SET is_blocked = TRUE, block_reason = $2, updated_at = now() \
             WHERE username = $1 \
             RETURNING id",
        )
        .bind(username)
        .bind(reason)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(user_id)
    }

    pub async fn pending_reports(&self) -> Result<Vec<ReportView>> {
        let rows = sqlx::query(
            "SELECT r.id, r.reporter_id, r.reported_user_id, r.reported_post_id, r.reason, \
                    r.status, r.created_at, \
                    ru.username AS reporter_username, \
                    tu.username AS reported_username, \
                    p.content AS post_content \
             FROM reports r \
             LEFT JOIN users ru ON ru.id = r.reporter_id \
             LEFT JOIN users tu ON tu.id = r.reported_user_id \
             LEFT JOIN posts p ON p.id = r.reported_post_id \
             WHERE r.status = 'pending' \
             ORDER BY r.created_at DESC, r.id DESC",
        )
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows.iter().map(ReportView::from_row).collect::<Result<Vec<_>, _>>()?)
    }

    /// Accepting removes the reported post and suspends the reported user. Only pending reports are handled.
    pub async fn handle_report(&self, report_id: i64, action: ReviewAction) -> Result<ReportResolution> {
        let mut tx = self.db.pool().begin().await?;

        let row = sqlx::query(
            "SELECT reported_user_id, reported_post_id FROM reports \
             WHERE id = $1 AND status = 'pending' FOR UPDATE",
        )
        .bind(report_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(ReportResolution::NotFound);
        };
        let reported_user_id: Option<i64> = row.try_get("reported_user_id")?;
        let reported_post_id: Option<i64> = row.try_get("reported_post_id")?;

        let mut suspended_user_id = None;
        if action == ReviewAction::Accept {
            if let Some(post_id) = reported_post_id {
                sqlx::query("UPDATE posts SET is_removed = TRUE WHERE id = $1")
                    .bind(post_id)
                    .execute(&mut *tx)
                    .await?;
            }
            if let Some(user_id) = reported_user_id {
                sqlx::query(
                    "UPDATE users SET is_blocked = TRUE, block_reason = $2, updated_at = now() \
                     WHERE id = $1",
                )
                .bind(user_id)
                .bind(REPORT_BLOCK_REASON)
                .execute(&mut *tx)
                .await?;
                suspended_user_id = Some(user_id);
            }
        }

        sqlx::query("UPDATE reports SET status = $2 WHERE id = $1")
            .bind(report_id)
            .bind(action.resolved_status())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(ReportResolution::Resolved { suspended_user_id })
    }

    pub async fn pending_verifications(&self) -> Result<Vec<VerificationRequestView>> {
        let rows = sqlx::query(
            "SELECT v.id, v.user_id, v.type, v.status, v.created_at, \
                    u.username, u.display_name, u.avatar_url \
             FROM verification_requests v \
             JOIN users u ON u.id = v.user_id \
             WHERE v.status = 'pending' \
             ORDER BY v.created_at DESC, v.id DESC",
        )
        .fetch_all(self.db.pool())
        .await?;
        rows.iter().map(VerificationRequestView::from_row).collect()
    }

    /// Returns false when no pending request has this id.
    pub async fn review_verification(&self, request_id: i64, action: ReviewAction) -> Result<bool> {
        let mut tx = self.db.pool().begin().await?;

        let row = sqlx::query(
            "SELECT user_id, type FROM verification_requests \
             WHERE id = $1 AND status = 'pending' FOR UPDATE",
        )
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(false);
        };

        if action == ReviewAction::Accept {
            let user_id: i64 = row.try_get("user_id")?;
            let kind: String = row.try_get("type")?;
            let kind = VerificationKind::from_db(&kind)
                .ok_or_else(|| anyhow::anyhow!("unknown verification type: {}", kind))?;
            sqlx::query(&format!(
                "UPDATE users SET {} = TRUE, updated_at = now() WHERE id = $1",
                kind.badge_column()
            ))
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE verification_requests SET status = $2 WHERE id = $1")
            .bind(request_id)
            .bind(action.resolved_status())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    pub async fn pending_appeals(&self) -> Result<Vec<AppealView>> {
        let rows = sqlx::query(
            "SELECT a.id, a.user_id, a.reason, a.status, a.created_at, \
                    u.username, u.display_name, u.avatar_url \
             FROM appeals a \
             JOIN users u ON u.id = a.user_id \
             WHERE a.status = 'pending' \
             ORDER BY a.created_at DESC, a.id DESC",
        )
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows.iter().map(AppealView::from_row).collect::<Result<Vec<_>, _>>()?)
    }

    /// Accepting lifts the suspension. Returns false when no pending appeal has this id.
    pub async fn handle_appeal(&self, appeal_id: i64, action: ReviewAction) -> Result<bool> {
        let mut tx = self.db.pool().begin().await?;

        let user_id: Option<i64> = sqlx::query_scalar(
            "SELECT user_id FROM appeals WHERE id = $1 AND status = 'pending' FOR UPDATE",
        )
        .bind(appeal_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(user_id) = user_id else {
            tx.rollback().await?;
            return Ok(false);
        };

        if action == ReviewAction::Accept {
            sqlx::query(
                "UPDATE users SET is_blocked = FALSE, block_reason = '', updated_at = now() \
                 WHERE id = $1",
            )
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE appeals SET status = $2 WHERE id = $1")
            .bind(appeal_id)
            .bind(action.resolved_status())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    pub async fn stats(&self) -> Result<AdminStats> {
        let row = sqlx::query(
            "SELECT \
                 (SELECT COUNT(*) FROM users WHERE is_blocked = FALSE) AS users, \
                 (SELECT COUNT(*) FROM posts WHERE is_removed = FALSE) AS posts, \
                 (SELECT COUNT(*) FROM reports WHERE status = 'pending') AS reports, \
                 (SELECT COUNT(*) FROM verification_requests WHERE status = 'pending') AS verifications, \
                 (SELECT COUNT(*) FROM appeals WHERE status = 'pending') AS appeals",
        )
        .fetch_one(self.db.pool())
        .await?;

        Ok(AdminStats {
            users: row.try_get("users")?,
            posts: row.try_get("posts")?,
            reports: row.try_get("reports")?,
            verifications: row.try_get("verifications")?,
            appeals: row.try_get("appeals")?,
        })
    }
}
