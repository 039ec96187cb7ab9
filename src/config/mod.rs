use anyhow::{anyhow, Result};
use std::net::SocketAddr;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_addr: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_connect_timeout_seconds: u64,
    pub db_idle_timeout_seconds: u64,
    pub db_max_lifetime_seconds: u64,
    pub run_migrations: bool,
    pub cors_max_age_seconds: u64,
    pub request_body_limit_bytes: usize,
    pub feed_page_size: i64,
    pub story_ttl_hours: i64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_addr = env_or("HTTP_ADDR", "0.0.0.0:8080");
        let _parsed_http_addr = SocketAddr::from_str(&http_addr)
            .map_err(|err| anyhow!("invalid HTTP_ADDR: {}", err))?;

        let feed_page_size: i64 = env_or_parse("FEED_PAGE_SIZE", "20")?;
        if !(1..=100).contains(&feed_page_size) {
            return Err(anyhow!("invalid FEED_PAGE_SIZE: must be between 1 and 100"));
        }
        let story_ttl_hours: i64 = env_or_parse("STORY_TTL_HOURS", "24")?;
        if story_ttl_hours <= 0 {
            return Err(anyhow!("invalid STORY_TTL_HOURS: must be positive"));
        }

        Ok(Self {
            http_addr,
            database_url: env_or_err("DATABASE_URL")?,
            db_max_connections: env_or_parse("DB_MAX_CONNECTIONS", "25")?,
            db_connect_timeout_seconds: env_or_parse("DB_CONNECT_TIMEOUT_SECONDS", "5")?,
            db_idle_timeout_seconds: env_or_parse("DB_IDLE_TIMEOUT_SECONDS", "300")?,
            db_max_lifetime_seconds: env_or_parse("DB_MAX_LIFETIME_SECONDS", "1800")?,
            run_migrations: env_or_parse("RUN_MIGRATIONS", "true")?,
            cors_max_age_seconds: env_or_parse("CORS_MAX_AGE_SECONDS", "86400")?,
            request_body_limit_bytes: env_or_parse("REQUEST_BODY_LIMIT_BYTES", "1048576")?,
            feed_page_size,
            story_ttl_hours,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_err(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| anyhow!("missing required env var: {}", key))
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}
