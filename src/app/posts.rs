use anyhow::Result;
use sqlx::types::Json;

use crate::app::access::{can_remove_post, AccessService, Listing, RemoveOutcome};
use crate::app::notifications::{NewNotification, NotificationService};
use crate::domain::notification::NotificationKind;
use crate::domain::post::{mark_liked, visible_to, Post, PostLikeToggle, POST_SELECT};
use crate::infra::db::Db;

const USER_LIST_LIMIT: i64 = 50;

#[derive(Debug, Clone)]
pub enum RepostOutcome {
    Reposted(Post),
    NotFound,
}

#[derive(Clone)]
pub struct PostService {
    db: Db,
}

impl PostService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create(&self, user_id: i64, content: &str, media_urls: Vec<String>) -> Result<Post> {
        let post_id: i64 = sqlx::query_scalar(
            "INSERT INTO posts (user_id, content, media_urls) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(user_id)
        .bind(content)
        .bind(Json(media_urls))
        .fetch_one(self.db.pool())
        .await?;

        self.load(post_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("post {} vanished after insert", post_id))
    }

    async fn load(&self, post_id: i64) -> Result<Option<Post>> {
        let row = sqlx::query(&format!("{} WHERE p.id = $1", POST_SELECT))
            .bind(post_id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.as_ref().map(Post::from_row).transpose()?)
    }

    pub async fn record_view(&self, post_id: i64) -> Result<()> {
        sqlx::query("UPDATE posts SET views_count = views_count + 1 WHERE id = $1")
            .bind(post_id)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    /// `None` when the post does not exist, was removed, or is hidden from the user.
    pub async fn toggle_like(&self, user_id: i64, post_id: i64) -> Result<Option<PostLikeToggle>> {
        if !self.is_visible(Some(user_id), post_id).await? {
            return Ok(None);
        }

        let mut tx = self.db.pool().begin().await?;

        let owner_id: Option<i64> = sqlx::query_scalar(
            "SELECT user_id FROM posts WHERE id = $1 AND is_removed = FALSE FOR UPDATE",
        )
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(owner_id) = owner_id else {
            tx.rollback().await?;
            return Ok(None);
        };

        let removed = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        let toggle = if removed.rows_affected() > 0 {
            let likes_count: i32 = sqlx::query_scalar(
                "UPDATE posts SET likes_count = GREATEST(likes_count - 1, 0) \
                 WHERE id = $1 RETURNING likes_count",
            )
            .bind(post_id)
            .fetch_one(&mut *tx)
            .await?;
            PostLikeToggle {
                liked: false,
                likes_count,
            }
        } else {
            sqlx::query("INSERT INTO likes (user_id, post_id) VALUES ($1, $2)")
                .bind(user_id)
                .bind(post_id)
                .execute(&mut *tx)
                .await?;
            let likes_count: i32 = sqlx::query_scalar(
                "UPDATE posts SET likes_count = likes_count + 1 WHERE id = $1 RETURNING likes_count",
            )
            .bind(post_id)
            .fetch_one(&mut *tx)
            .await?;
            NotificationService::notify_with_tx(
                NewNotification::new(owner_id, user_id, NotificationKind::Like).with_post(post_id),
                &mut tx,
            )
            .await?;
            PostLikeToggle {
                liked: true,
                likes_count,
            }
        };

        tx.commit().await?;
        Ok(Some(toggle))
    }

    /// Reposting a repost targets its original. Posts hidden from the user cannot be reposted.
    pub async fn repost(&self, user_id: i64, post_id: i64) -> Result<RepostOutcome> {
        let Some(source) = self.get_visible(Some(user_id), post_id).await? else {
            return Ok(RepostOutcome::NotFound);
        };
        let target_id = match (source.is_repost, source.original_post_id) {
            (true, Some(original)) => original,
            _ => source.id,
        };

        let mut tx = self.db.pool().begin().await?;

        let target_owner: Option<i64> = sqlx::query_scalar(
            "SELECT user_id FROM posts WHERE id = $1 AND is_removed = FALSE FOR UPDATE",
        )
        .bind(target_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(target_owner) = target_owner else {
            tx.rollback().await?;
            return Ok(RepostOutcome::NotFound);
        };

        let repost_id: i64 = sqlx::query_scalar(
            "INSERT INTO posts (user_id, content, media_urls, is_repost, original_post_id) \
             VALUES ($1, '', '[]'::jsonb, TRUE, $2) \
             RETURNING id",
        )
        .bind(user_id)
        .bind(target_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE posts SET reposts_count = reposts_count + 1 WHERE id = $1")
            .bind(target_id)
            .execute(&mut *tx)
            .await?;

        NotificationService::notify_with_tx(
            NewNotification::new(target_owner, user_id, NotificationKind::Repost)
                .with_post(target_id),
            &mut tx,
        )
        .await?;

        tx.commit().await?;

        match self.load(repost_id).await? {
            Some(post) => Ok(RepostOutcome::Reposted(post)),
            None => Err(anyhow::anyhow!("repost {} vanished after insert", repost_id)),
        }
    }

    pub async fn remove(&self, caller_id: i64, caller_is_admin: bool, post_id: i64) -> Result<RemoveOutcome> {
        let author_id: Option<i64> = sqlx::query_scalar(
            "SELECT user_id FROM posts WHERE id = $1 AND is_removed = FALSE",
        )
        .bind(post_id)
        .fetch_optional(self.db.pool())
        .await?;

        let Some(author_id) = author_id else {
            return Ok(RemoveOutcome::NotFound);
        };
        if !can_remove_post(caller_id, caller_is_admin, author_id) {
            return Ok(RemoveOutcome::Forbidden);
        }

        sqlx::query("UPDATE posts SET is_removed = TRUE WHERE id = $1")
            .bind(post_id)
            .execute(self.db.pool())
            .await?;

        Ok(RemoveOutcome::Removed)
    }

    /// A single post as the viewer may see it, or `None` when it is gone or hidden.
    pub async fn get_visible(&self, viewer_id: Option<i64>, post_id: i64) -> Result<Option<Post>> {
        let row = sqlx::query(&format!(
            "{} WHERE p.id = $2 AND {}",
            POST_SELECT,
            visible_to("$1")
        ))
        .bind(viewer_id)
        .bind(post_id)
        .fetch_optional(self.db.pool())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut post = Post::from_row(&row)?;

        if let Some(viewer) = viewer_id {
            let liked = self.liked_ids(viewer, &[post.id]).await?;
            post.is_liked = Some(liked.contains(&post.id));
        }

        Ok(Some(post))
    }

    pub async fn is_visible(&self, viewer_id: Option<i64>, post_id: i64) -> Result<bool> {
        let visible: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS ({} WHERE p.id = $2 AND {})",
            POST_SELECT,
            visible_to("$1")
        ))
        .bind(viewer_id)
        .bind(post_id)
        .fetch_one(self.db.pool())
        .await?;
        Ok(visible)
    }

    /// Subset of `post_ids` the user has liked.
    pub async fn liked_ids(&self, user_id: i64, post_ids: &[i64]) -> Result<Vec<i64>> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT post_id FROM likes WHERE user_id = $1 AND post_id = ANY($2)",
        )
        .bind(user_id)
        .bind(post_ids)
        .fetch_all(self.db.pool())
        .await?;
        Ok(ids)
    }

    /// Attaches `is_liked` for a signed-in viewer.
    pub async fn annotate_likes(&self, viewer_id: Option<i64>, posts: &mut [Post]) -> Result<()> {
        let Some(viewer) = viewer_id else {
            return Ok(());
        };
        let ids: Vec<i64> = posts.iter().map(|post| post.id).collect();
        let liked = self.liked_ids(viewer, &ids).await?;
        mark_liked(posts, &liked);
        Ok(())
    }

    pub async fn liked_by_user(&self, viewer_id: Option<i64>, user_id: i64) -> Result<Listing<Post>> {
        let access = AccessService::new(self.db.clone());
        let Some(settings) = access.privacy_settings(user_id).await? else {
            return Ok(Listing::visible(Vec::new()));
        };
        if !access.list_visible_to(settings.show_likes, viewer_id, user_id).await? {
            return Ok(Listing::hidden());
        }

        let rows = sqlx::query(&format!(
            "{} JOIN likes l ON l.post_id = p.id \
             WHERE l.user_id = $1 AND {} \
             ORDER BY l.created_at DESC, l.id DESC \
             LIMIT $2",
            POST_SELECT,
            visible_to("$3")
        ))
        .bind(user_id)
        .bind(USER_LIST_LIMIT)
        .bind(viewer_id)
        .fetch_all(self.db.pool())
        .await?;

        let mut posts = rows.iter().map(Post::from_row).collect::<Result<Vec<_>, _>>()?;
        self.annotate_likes(viewer_id, &mut posts).await?;
        Ok(Listing::visible(posts))
    }

    pub async fn reposts_by_user(&self, viewer_id: Option<i64>, user_id: i64) -> Result<Listing<Post>> {
        let access = AccessService::new(self.db.clone());
        let Some(settings) = access.privacy_settings(user_id).await? else {
            return Ok(Listing::visible(Vec::new()));
        };
        if !access.list_visible_to(settings.show_reposts, viewer_id, user_id).await? {
            return Ok(Listing::hidden());
        }

        let rows = sqlx::query(&format!(
            "{} WHERE p.user_id = $1 AND p.is_repost = TRUE AND {} \
             ORDER BY p.created_at DESC, p.id DESC \
             LIMIT $2",
            POST_SELECT,
            visible_to("$3")
        ))
        .bind(user_id)
        .bind(USER_LIST_LIMIT)
        .bind(viewer_id)
        .fetch_all(self.db.pool())
        .await?;

        let mut posts = rows.iter().map(Post::from_row).collect::<Result<Vec<_>, _>>()?;
        self.annotate_likes(viewer_id, &mut posts).await?;
        Ok(Listing::visible(posts))
    }
}
