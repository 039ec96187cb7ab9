use anyhow::Result;
use sqlx::Row;

use crate::app::access::RemoveOutcome;
use crate::app::notifications::{NewNotification, NotificationService};
use crate::app::posts::PostService;
use crate::domain::engagement::{
    author_liked_after_toggle, can_remove_comment, Comment, CommentLikeToggle, COMMENT_SELECT,
};
use crate::domain::notification::NotificationKind;
use crate::infra::db::Db;

#[derive(Debug, Clone)]
pub enum CommentOutcome {
    Created(Comment),
    PostNotFound,
    InvalidParent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinOutcome {
    Pinned(bool),
    NotFound,
    Forbidden,
}

#[derive(Clone)]
pub struct EngagementService {
    db: Db,
}

impl EngagementService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    fn posts(&self) -> PostService {
        PostService::new(self.db.clone())
    }

    /// Pinned comments first, then oldest first. `None` when the post is hidden from the viewer.
    pub async fn list_comments(
        &self,
        viewer_id: Option<i64>,
        post_id: i64,
    ) -> Result<Option<Vec<Comment>>> {
        if !self.posts().is_visible(viewer_id, post_id).await? {
            return Ok(None);
        }

        let rows = sqlx::query(&format!(
            "{} WHERE c.post_id = $1 AND c.is_removed = FALSE \
             ORDER BY c.is_pinned DESC, c.created_at ASC, c.id ASC",
            COMMENT_SELECT
        ))
        .bind(post_id)
        .fetch_all(self.db.pool())
        .await?;

        let mut comments = rows.iter().map(Comment::from_row).collect::<Result<Vec<_>, _>>()?;

        if let Some(viewer) = viewer_id {
            let ids: Vec<i64> = comments.iter().map(|comment| comment.id).collect();
            let liked: Vec<i64> = sqlx::query_scalar(
                "SELECT comment_id FROM likes WHERE user_id = $1 AND comment_id = ANY($2)",
            )
            .bind(viewer)
            .bind(&ids)
            .fetch_all(self.db.pool())
            .await?;
            for comment in comments.iter_mut() {
                comment.is_liked = Some(liked.contains(&comment.id));
            }
        }

        Ok(Some(comments))
    }

    pub async fn create_comment(
        &self,
        user_id: i64,
        post_id: i64,
        content: &str,
        parent_id: Option<i64>,
    ) -> Result<CommentOutcome> {
        if !self.posts().is_visible(Some(user_id), post_id).await? {
            return Ok(CommentOutcome::PostNotFound);
        }

        let mut tx = self.db.pool().begin().await?;

        let post_owner: Option<i64> = sqlx::query_scalar(
            "SELECT user_id FROM posts WHERE id = $1 AND is_removed = FALSE FOR UPDATE",
        )
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(post_owner) = post_owner else {
            tx.rollback().await?;
            return Ok(CommentOutcome::PostNotFound);
        };

        if let Some(parent_id) = parent_id {
            let parent_ok: bool = sqlx::query_scalar(
                "SELECT EXISTS ( \
                     SELECT 1 FROM comments WHERE id = $1 AND post_id = $2 AND is_removed = FALSE \
                 )",
            )
            .bind(parent_id)
            .bind(post_id)
            .fetch_one(&mut *tx)
            .await?;
            if !parent_ok {
                tx.rollback().await?;
                return Ok(CommentOutcome::InvalidParent);
            }
        }

        let comment_id: i64 = sqlx::query_scalar(
            "INSERT INTO comments (post_id, user_id, parent_id, content) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id",
        )
        .bind(post_id)
        .bind(user_id)
        .bind(parent_id)
        .bind(content)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE posts SET comments_count = comments_count + 1 WHERE id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        NotificationService::notify_with_tx(
            NewNotification::new(post_owner, user_id, NotificationKind::Comment)
                .with_post(post_id)
                .with_comment(comment_id),
            &mut tx,
        )
        .await?;

        let row = sqlx::query(&format!("{} WHERE c.id = $1", COMMENT_SELECT))
            .bind(comment_id)
            .fetch_one(&mut *tx)
            .await?;
        let comment = Comment::from_row(&row)?;

        tx.commit().await?;
        Ok(CommentOutcome::Created(comment))
    }

    /// `None` when the comment does not exist, was removed, or sits on a post hidden from the user.
    pub async fn toggle_comment_like(
        &self,
        user_id: i64,
        comment_id: i64,
    ) -> Result<Option<CommentLikeToggle>> {
        let post_id: Option<i64> = sqlx::query_scalar(
            "SELECT post_id FROM comments WHERE id = $1 AND is_removed = FALSE",
        )
        .bind(comment_id)
        .fetch_optional(self.db.pool())
        .await?;
        let Some(post_id) = post_id else {
            return Ok(None);
        };
        if !self.posts().is_visible(Some(user_id), post_id).await? {
            return Ok(None);
        }

        let mut tx = self.db.pool().begin().await?;

        let row = sqlx::query(
            "SELECT c.user_id, c.is_author_liked, p.user_id AS post_owner \
             FROM comments c \
             JOIN posts p ON p.id = c.post_id \
             WHERE c.id = $1 AND c.is_removed = FALSE \
             FOR UPDATE OF c",
        )
        .bind(comment_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        let author_id: i64 = row.try_get("user_id")?;
        let post_owner: i64 = row.try_get("post_owner")?;
        let current_badge: bool = row.try_get("is_author_liked")?;

        let removed = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND comment_id = $2")
            .bind(user_id)
            .bind(comment_id)
            .execute(&mut *tx)
            .await?;
        let liked = removed.rows_affected() == 0;
        if liked {
            sqlx::query("INSERT INTO likes (user_id, comment_id) VALUES ($1, $2)")
                .bind(user_id)
                .bind(comment_id)
                .execute(&mut *tx)
                .await?;
        }

        let is_author_liked =
            author_liked_after_toggle(current_badge, user_id, post_owner, author_id, liked);
        let delta: i32 = if liked { 1 } else { -1 };
        let likes_count: i32 = sqlx::query_scalar(
            "UPDATE comments \
             SET likes_count = GREATEST(likes_count + $2, 0), is_author_liked = $3 \
             WHERE id = $1 \
             RETURNING likes_count",
        )
        .bind(comment_id)
        .bind(delta)
        .bind(is_author_liked)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(CommentLikeToggle {
            liked,
            likes_count,
            is_author_liked,
        }))
    }

    /// Only the owner of the post may pin its comments.
    pub async fn toggle_pin(&self, user_id: i64, comment_id: i64) -> Result<PinOutcome> {
        let post_owner: Option<i64> = sqlx::query_scalar(
            "SELECT p.user_id FROM comments c JOIN posts p ON p.id = c.post_id \
             WHERE c.id = $1 AND c.is_removed = FALSE",
        )
        .bind(comment_id)
        .fetch_optional(self.db.pool())
        .await?;

        match post_owner {
            None => Ok(PinOutcome::NotFound),
            Some(owner) if owner != user_id => Ok(PinOutcome::Forbidden),
            Some(_) => {
                let pinned: bool = sqlx::query_scalar(
                    "UPDATE comments SET is_pinned = NOT is_pinned WHERE id = $1 RETURNING is_pinned",
                )
                .bind(comment_id)
                .fetch_one(self.db.pool())
                .await?;
                Ok(PinOutcome::Pinned(pinned))
            }
        }
    }

    pub async fn remove_comment(
        &self,
        caller_id: i64,
        caller_is_admin: bool,
        comment_id: i64,
    ) -> Result<RemoveOutcome> {
        let mut tx = self.db.pool().begin().await?;

        let row = sqlx::query(
            "SELECT c.user_id, c.post_id, p.user_id AS post_owner \
             FROM comments c \
             JOIN posts p ON p.id = c.post_id \
             WHERE c.id = $1 AND c.is_removed = FALSE \
             FOR UPDATE OF c",
        )
        .bind(comment_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(RemoveOutcome::NotFound);
        };

        let author_id: i64 = row.try_get("user_id")?;
        let post_id: i64 = row.try_get("post_id")?;
        let post_owner: i64 = row.try_get("post_owner")?;
        if !can_remove_comment(caller_id, caller_is_admin, author_id, post_owner) {
            tx.rollback().await?;
            return Ok(RemoveOutcome::Forbidden);
        }

        sqlx::query("UPDATE comments SET is_removed = TRUE WHERE id = $1")
            .bind(comment_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "UPDATE posts SET comments_count = GREATEST(comments_count - 1, 0) WHERE id = $1",
        )
        .bind(post_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(RemoveOutcome::Removed)
    }
}
