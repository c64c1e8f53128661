//! Database Migrations
//!
//! Creates the user table on first start.

use anyhow::{Context, Result};
use deadpool_postgres::Pool;

const CREATE_USERS: &str = "
CREATE TABLE IF NOT EXISTS users (
    id                  TEXT PRIMARY KEY,
    username            TEXT NOT NULL,
    normalized_username TEXT NOT NULL UNIQUE,
    email               TEXT,
    password_hash       TEXT NOT NULL,
    created_at          TIMESTAMPTZ NOT NULL DEFAULT NOW()
)";

/// Run all pending migrations
pub async fn run_migrations(pool: &Pool) -> Result<()> {
    if !needs_migration(pool).await? {
        tracing::debug!("users table present, skipping migrations");
        return Ok(());
    }

    tracing::info!("Running database migrations...");
    let client = pool.get().await.context("Failed to get connection for migrations")?;
    client
        .batch_execute(CREATE_USERS)
        .await
        .context("Failed to create users table")?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}

/// Check if database needs migrations
pub async fn needs_migration(pool: &Pool) -> Result<bool> {
    let client = pool.get().await.context("Failed to get connection for migration check")?;

    let result = client
        .query_one(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'users'",
            &[],
        )
        .await?;

    let count: i64 = result.get(0);
    Ok(count == 0)
}
