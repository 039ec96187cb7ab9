use anyhow::Result;

use crate::app::posts::PostService;
use crate::domain::post::{visible_to, Post, POST_SELECT};
use crate::infra::db::Db;

#[derive(Clone)]
pub struct FeedService {
    db: Db,
}

impl FeedService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Newest-first page of live posts the viewer may see.
    pub async fn page(&self, viewer_id: Option<i64>, page: i64, page_size: i64) -> Result<Vec<Post>> {
        let offset = page.saturating_mul(page_size);
        let rows = sqlx::query(&format!(
            "{} WHERE {} \
             ORDER BY p.created_at DESC, p.id DESC \
             LIMIT $2 OFFSET $3",
            POST_SELECT,
            visible_to("$1")
        ))
        .bind(viewer_id)
        .bind(page_size)
        .bind(offset)
        .fetch_all(self.db.pool())
        .await?;

        let mut posts = rows.iter().map(Post::from_row).collect::<Result<Vec<_>, _>>()?;
        PostService::new(self.db.clone())
            .annotate_likes(viewer_id, &mut posts)
            .await?;
        Ok(posts)
    }
}
