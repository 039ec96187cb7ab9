pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use crate::config::AppConfig;
use crate::infra::{db::Db, tokens::TokenStore};

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub tokens: TokenStore,
    pub feed_page_size: i64,
    pub story_ttl_hours: i64,
}

impl AppState {
    pub fn new(db: Db, config: &AppConfig) -> Self {
        Self {
            db,
            tokens: TokenStore::new(),
            feed_page_size: config.feed_page_size,
            story_ttl_hours: config.story_ttl_hours,
        }
    }
}
