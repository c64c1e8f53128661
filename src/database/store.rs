//! User store abstraction and its in-memory implementation

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::database::models::{normalize_username, NewUser, StoredUser};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Username '{0}' is already taken.")]
    DuplicateUsername(String),
    #[error("database error: {0:#}")]
    Database(#[from] anyhow::Error),
}

/// Persistence for registered accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<StoredUser, StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<StoredUser>, StoreError>;
}

/// Process-local store used when no database is configured, and in tests.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, StoredUser>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create_user(&self, user: NewUser) -> Result<StoredUser, StoreError> {
        let key = normalize_username(&user.username);
        let mut users = self.users.write().await;
        if users.contains_key(&key) {
            return Err(StoreError::DuplicateUsername(user.username));
        }

        let stored = user.into_stored();
        users.insert(key, stored.clone());
        Ok(stored)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<StoredUser>, StoreError> {
        let users = self.users.read().await;
        Ok(users.get(&normalize_username(username)).cloned())
    }
}
