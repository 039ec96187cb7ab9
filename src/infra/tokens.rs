use rand::RngCore;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

const TOKEN_BYTES: usize = 32;

/// Bearer tokens held in process memory. Tokens do not expire and are lost on
/// restart; clients log in again.
#[derive(Clone, Default)]
pub struct TokenStore {
    inner: Arc<RwLock<HashMap<String, i64>>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self, user_id: i64) -> String {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = hex::encode(bytes);
        self.write().insert(token.clone(), user_id);
        token
    }

    pub fn resolve(&self, token: &str) -> Option<i64> {
        self.read().get(token).copied()
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.write().remove(token).is_some()
    }

    /// Drops every token issued to the user. Returns how many were removed.
    pub fn revoke_user(&self, user_id: i64) -> usize {
        let mut tokens = self.write();
        let before = tokens.len();
        tokens.retain(|_, owner| *owner != user_id);
        before - tokens.len()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, i64>> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, i64>> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
