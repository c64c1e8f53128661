//! # Database Module
//!
//! User persistence: the `UserStore` trait, a PostgreSQL implementation on
//! tokio-postgres with a deadpool pool, and an in-memory fallback.

pub mod connection;
pub mod migrations;
pub mod models;
pub mod store;

pub use connection::DatabaseConnection;
pub use models::{NewUser, StoredUser};
pub use store::{InMemoryUserStore, StoreError, UserStore};
