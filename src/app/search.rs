use anyhow::Result;

use crate::domain::user::UserSummary;
use crate::infra::db::Db;

const SEARCH_LIMIT: i64 = 30;

#[derive(Clone)]
pub struct SearchService {
    db: Db,
}

impl SearchService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Users with a block in either direction are left out.
    pub async fn search_users(&self, viewer_id: Option<i64>, query: &str) -> Result<Vec<UserSummary>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let pattern = format!("%{}%", escape_like_pattern(query));
        let rows = sqlx::query(
            "SELECT u.id, u.username, u.display_name, u.avatar_url, u.is_verified, u.is_artist_verified \
             FROM users u \
             WHERE (u.username ILIKE $1 ESCAPE '\\' OR u.display_name ILIKE $1 ESCAPE '\\') \
               AND u.is_blocked = FALSE \
               AND ($2::BIGINT IS NULL OR NOT EXISTS ( \
                   SELECT 1 FROM user_blocks b \
                   WHERE (b.blocker_id = $2 AND b.blocked_id = u.id) \
                      OR (b.blocker_id = u.id AND b.blocked_id = $2) \
               )) \
             ORDER BY u.username ASC \
             LIMIT $3",
        )
        .bind(&pattern)
        .bind(viewer_id)
        .bind(SEARCH_LIMIT)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(UserSummary::from_row).collect::<Result<Vec<_>, _>>()?)
    }
}

fn escape_like_pattern(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '%' | '_' | '\\' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::escape_like_pattern;

    #[test]
    fn plain_text_is_untouched() {
        assert_eq!(escape_like_pattern("alice"), "alice");
    }

    #[test]
    fn metacharacters_are_escaped() {
        assert_eq!(escape_like_pattern("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like_pattern("a\\b"), "a\\\\b");
    }
}
