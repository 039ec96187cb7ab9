use anyhow::Result;

use crate::domain::release::Release;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct ReleaseService {
    db: Db,
}

impl ReleaseService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// `None` when no user has that username.
    pub async fn create(
        &self,
        username: &str,
        title: &str,
        artist: &str,
        cover_url: &str,
    ) -> Result<Option<Release>> {
        let row = sqlx::query(
            "INSERT INTO releases (user_id, title, artist, cover_url) \
             SELECT id, $2, $3, $4 FROM users WHERE username = $1 \
             RETURNING id, user_id, title, artist, cover_url, created_at",
        )
        .bind(username)
        .bind(title)
        .bind(artist)
        .bind(cover_url)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row.as_ref().map(Release::from_row).transpose()?)
    }

    pub async fn for_user(&self, user_id: i64) -> Result<Vec<Release>> {
        let rows = sqlx::query(
            "SELECT id, user_id, title, artist, cover_url, created_at \
             FROM releases WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows.iter().map(Release::from_row).collect::<Result<Vec<_>, _>>()?)
    }
}
