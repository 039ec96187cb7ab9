use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize)]
pub struct Release {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub artist: String,
    pub cover_url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Release {
    pub fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            title: row.try_get("title")?,
            artist: row.try_get("artist")?,
            cover_url: row.try_get("cover_url")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
