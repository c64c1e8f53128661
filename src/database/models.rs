// Database Models
//
// Tokio-postgres compatible models for the user table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;
use uuid::Uuid;

/// Trait for converting from tokio-postgres Row
pub trait FromRow {
    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> where Self: Sized;
}

/// User account information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredUser {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl FromRow for StoredUser {
    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Account about to be inserted; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

impl NewUser {
    /// Assign an id and creation time.
    pub fn into_stored(self) -> StoredUser {
        StoredUser {
            id: Uuid::new_v4().to_string(),
            username: self.username,
            email: Some(self.email),
            password_hash: self.password_hash,
            created_at: Utc::now(),
        }
    }
}

/// Lookup key for usernames, which compare case-insensitively.
pub fn normalize_username(username: &str) -> String {
    username.trim().to_uppercase()
}
