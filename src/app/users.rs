use anyhow::Result;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::Row;
use time::OffsetDateTime;

use crate::app::access::{can_view_profile_content, AccessService};
use crate::app::posts::PostService;
use crate::domain::moderation::SELF_REMOVAL_REASON;
use crate::domain::post::{original_visible_to, Post, POST_SELECT};
use crate::domain::privacy::PrivacySettings;
use crate::domain::social_graph::FollowStatus;
use crate::domain::user::{Profile, ProfileFollowStatus, Theme, User, USER_COLUMNS};
use crate::infra::db::Db;

const PROFILE_POST_LIMIT: i64 = 50;

#[derive(Debug, Clone)]
pub struct ProfilePage {
    pub profile: Profile,
    pub posts: Vec<Post>,
}

/// Fields a user may change on their profile. `None` leaves the column as is.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub is_private: Option<bool>,
    pub links: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct AvatarGallery {
    pub avatars: Vec<String>,
    pub avatar_url: String,
}

#[derive(Clone)]
pub struct UserService {
    db: Db,
}

impl UserService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// `None` for unknown users and for suspended users seen by anyone but themselves.
    pub async fn profile(&self, viewer_id: Option<i64>, username: &str) -> Result<Option<ProfilePage>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS))
            .bind(username)
            .fetch_optional(self.db.pool())
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let user = User::from_row(&row)?;
        let owner_id = user.id;
        let is_owner = viewer_id == Some(owner_id);
        if user.is_blocked && !is_owner {
            return Ok(None);
        }

        let is_private = user.is_private;
        let mut profile = Profile::from_user(user);

        let counts = sqlx::query(
            "SELECT \
                 (SELECT COUNT(*) FROM follows WHERE following_id = $1 AND status = 'active') AS followers_count, \
                 (SELECT COUNT(*) FROM follows WHERE follower_id = $1 AND status = 'active') AS following_count, \
                 (SELECT COUNT(*) FROM posts WHERE user_id = $1 AND is_removed = FALSE) AS posts_count",
        )
        .bind(owner_id)
        .fetch_one(self.db.pool())
        .await?;
        profile.followers_count = counts.try_get("followers_count")?;
        profile.following_count = counts.try_get("following_count")?;
        profile.posts_count = counts.try_get("posts_count")?;

        let access = AccessService::new(self.db.clone());
        let mut follows_active = false;
        let mut blocked = false;
        if let Some(viewer) = viewer_id {
            let status = if is_owner {
                None
            } else {
                access.follow_status(viewer, owner_id).await?
            };
            follows_active = status == Some(FollowStatus::Active);
            profile.follow_status = Some(ProfileFollowStatus::from(status));
            profile.is_blocked_by_me = Some(access.has_blocked(viewer, owner_id).await?);
            blocked = !is_owner && access.is_blocked_between(viewer, owner_id).await?;
        }

        profile.can_see_posts =
            !blocked && can_view_profile_content(viewer_id, owner_id, is_private, follows_active);

        let mut posts = Vec::new();
        if profile.can_see_posts {
            let rows = sqlx::query(&format!(
                "{} WHERE p.user_id = $1 AND p.is_removed = FALSE AND {} \
                 ORDER BY p.created_at DESC, p.id DESC \
                 LIMIT $2",
                POST_SELECT,
                original_visible_to("$3")
            ))
            .bind(owner_id)
            .bind(PROFILE_POST_LIMIT)
            .bind(viewer_id)
            .fetch_all(self.db.pool())
            .await?;
            posts = rows.iter().map(Post::from_row).collect::<Result<Vec<_>, _>>()?;
            PostService::new(self.db.clone())
                .annotate_likes(viewer_id, &mut posts)
                .await?;
        }

        Ok(Some(ProfilePage { profile, posts }))
    }

    pub async fn update_profile(&self, user_id: i64, update: ProfileUpdate) -> Result<()> {
        sqlx::query(
            "UPDATE users SET \
                 display_name = COALESCE($2, display_name), \
                 bio = COALESCE($3, bio), \
                 is_private = COALESCE($4, is_private), \
                 links = COALESCE($5, links), \
                 updated_at = now() \
             WHERE id = $1",
        )
        .bind(user_id)
        .bind(update.display_name)
        .bind(update.bio)
        .bind(update.is_private)
        .bind(update.links.map(Json))
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    /// Sets the main avatar and adds it to the gallery. `None` when the user is gone.
    pub async fn set_avatar(&self, user_id: i64, avatar_url: &str) -> Result<Option<Vec<String>>> {
        let mut tx = self.db.pool().begin().await?;

        let avatars: Option<Json<Vec<String>>> =
            sqlx::query_scalar("SELECT avatars FROM users WHERE id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(Json(mut avatars)) = avatars else {
            tx.rollback().await?;
            return Ok(None);
        };

        add_to_gallery(&mut avatars, avatar_url);

        sqlx::query(
            "UPDATE users SET avatar_url = $2, avatars = $3, updated_at = now() WHERE id = $1",
        )
        .bind(user_id)
        .bind(avatar_url)
        .bind(Json(&avatars))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(avatars))
    }

    pub async fn remove_avatar(&self, user_id: i64, avatar_url: &str) -> Result<Option<AvatarGallery>> {
        let mut tx = self.db.pool().begin().await?;

        let avatars: Option<Json<Vec<String>>> =
            sqlx::query_scalar("SELECT avatars FROM users WHERE id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(Json(mut avatars)) = avatars else {
            tx.rollback().await?;
            return Ok(None);
        };

        let main = remove_from_gallery(&mut avatars, avatar_url);

        sqlx::query(
            "UPDATE users SET avatar_url = $2, avatars = $3, updated_at = now() WHERE id = $1",
        )
        .bind(user_id)
        .bind(&main)
        .bind(Json(&avatars))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(AvatarGallery {
            avatars,
            avatar_url: main,
        }))
    }

    pub async fn set_theme(&self, user_id: i64, theme: Theme) -> Result<()> {
        sqlx::query("UPDATE users SET theme = $2, updated_at = now() WHERE id = $1")
            .bind(user_id)
            .bind(theme.as_db())
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    pub async fn set_privacy(&self, user_id: i64, settings: &PrivacySettings) -> Result<()> {
        sqlx::query("UPDATE users SET privacy_settings = $2, updated_at = now() WHERE id = $1")
            .bind(user_id)
            .bind(Json(settings))
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    /// Suspends the account and frees its username. Tokens are revoked by the caller.
    pub async fn remove_account(&self, user_id: i64) -> Result<bool> {
        let suffix = format!("_removed_{}", OffsetDateTime::now_utc().unix_timestamp());
        let result = sqlx::query(
            "UPDATE users SET \
                 is_blocked = TRUE, \
                 block_reason = $2, \
                 username = username || $3, \
                 updated_at = now() \
             WHERE id = $1",
        )
        .bind(user_id)
        .bind(SELF_REMOVAL_REASON)
        .bind(suffix)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() > 0 {
            tracing::info!(user_id, "account removed by owner");
        }
        Ok(result.rows_affected() > 0)
    }
}

fn add_to_gallery(avatars: &mut Vec<String>, avatar_url: &str) {
    if !avatars.iter().any(|existing| existing == avatar_url) {
        avatars.push(avatar_url.to_string());
    }
}

/// Drops the URL and returns the new main avatar: the last remaining one, or empty.
fn remove_from_gallery(avatars: &mut Vec<String>, avatar_url: &str) -> String {
    avatars.retain(|existing| existing != avatar_url);
    avatars.last().cloned().unwrap_or_default()
}
