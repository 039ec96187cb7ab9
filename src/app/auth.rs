use anyhow::{anyhow, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use sha2::{Digest, Sha256};
use sqlx::Row;
use subtle::ConstantTimeEq;

use crate::domain::user::{User, USER_COLUMNS};
use crate::infra::db::Db;
use crate::infra::tokens::TokenStore;

pub const MIN_USERNAME_LEN: usize = 3;

#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: i64,
    pub token: String,
    pub is_blocked: bool,
    pub block_reason: String,
}

#[derive(Debug, Clone)]
pub enum RegisterOutcome {
    Registered(Session),
    Taken,
    /// Lost a race with a concurrent registration for the same identity.
    Conflict,
}

#[derive(Clone)]
pub struct AuthService {
    db: Db,
    tokens: TokenStore,
}

impl AuthService {
    pub fn new(db: Db, tokens: TokenStore) -> Self {
        Self { db, tokens }
    }

    /// Expects a normalized username and email (see [`normalize_identity`]).
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<RegisterOutcome> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM users WHERE username = $1 OR email = $2)",
        )
        .bind(username)
        .bind(email)
        .fetch_one(self.db.pool())
        .await?;
        if taken {
            return Ok(RegisterOutcome::Taken);
        }

        let password_hash = hash_password(password)?;
        let inserted = sqlx::query_scalar::<_, i64>(
            "INSERT INTO users (username, email, password_hash, display_name) \
             VALUES ($1, $2, $3, $1) \
             RETURNING id",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(self.db.pool())
        .await;

        let user_id = match inserted {
            Ok(user_id) => user_id,
            Err(err) if is_unique_violation(&err) => return Ok(RegisterOutcome::Conflict),
            Err(err) => return Err(err.into()),
        };

        tracing::info!(user_id, "user registered");
        Ok(RegisterOutcome::Registered(Session {
            user_id,
            token: self.tokens.issue(user_id),
            is_blocked: false,
            block_reason: String::new(),
        }))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Option<Session>> {
        let row = sqlx::query(
            "SELECT id, password_hash, is_blocked, block_reason FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(self.db.pool())
        .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        let user_id: i64 = row.try_get("id")?;
        let password_hash: String = row.try_get("password_hash")?;
        if password_hash.is_empty() || !verify_password(password, &password_hash)? {
            return Ok(None);
        }

        Ok(Some(Session {
            user_id,
            token: self.tokens.issue(user_id),
            is_blocked: row.try_get("is_blocked")?,
            block_reason: row.try_get("block_reason")?,
        }))
    }

    pub async fn me(&self, user_id: i64) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(user_id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.as_ref().map(User::from_row).transpose()?)
    }

    pub fn logout(&self, token: &str) -> bool {
        self.tokens.revoke(token)
    }
}

/// Trims and lower-cases the login identifiers.
pub fn normalize_identity(username: &str, email: &str) -> (String, String) {
    (username.trim().to_lowercase(), email.trim().to_lowercase())
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {}", err))?;
    Ok(hash.to_string())
}

/// Accepts Argon2 PHC strings and legacy unsalted SHA-256 hex digests.
pub fn verify_password(password: &str, stored: &str) -> Result<bool> {
    if stored.starts_with("$argon2") {
        let parsed = PasswordHash::new(stored)
            .map_err(|err| anyhow!("failed to parse password hash: {}", err))?;
        return Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok());
    }

    let digest = hex::encode(Sha256::digest(password.as_bytes()));
    let stored = stored.to_ascii_lowercase();
    Ok(digest.as_bytes().ct_eq(stored.as_bytes()).into())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db_err| db_err.code())
        .map(|code| code == "23505")
        .unwrap_or(false)
}
