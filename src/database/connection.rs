// Database Connection Management
//
// PostgreSQL connection pooling with tokio-postgres and deadpool, plus the
// Postgres-backed user store.
use anyhow::{Context, Result};
use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use std::time::Duration;
use tokio_postgres::error::SqlState;

use crate::database::models::{normalize_username, FromRow, NewUser, StoredUser};
use crate::database::store::{StoreError, UserStore};

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
    pub max_size: usize,
    pub timeouts: deadpool_postgres::Timeouts,
}

impl DatabaseConfig {
    /// Create configuration from database URL
    pub fn from_url(url: &str) -> Result<Self> {
        let parsed = url::Url::parse(url)
            .context("Failed to parse database URL")?;

        if parsed.scheme() != "postgresql" && parsed.scheme() != "postgres" {
            anyhow::bail!("Invalid database URL scheme, expected postgresql or postgres");
        }

        Ok(Self {
            host: parsed.host_str().unwrap_or("localhost").to_string(),
            port: parsed.port().unwrap_or(5432),
            user: parsed.username().to_string(),
            password: parsed.password().unwrap_or("").to_string(),
            dbname: parsed.path().trim_start_matches('/').to_string(),
            max_size: 16,
            timeouts: deadpool_postgres::Timeouts {
                wait: Some(Duration::from_secs(30)),
                create: Some(Duration::from_secs(30)),
                recycle: Some(Duration::from_secs(30)),
            },
        })
    }
}

/// Database connection wrapper
#[derive(Debug, Clone)]
pub struct DatabaseConnection {
    pool: Pool,
}

impl DatabaseConnection {
    /// Create a new database connection with the provided configuration
    pub async fn new(config: DatabaseConfig) -> Result<Self> {
        tracing::info!("Connecting to database: {}:{}/{}", config.host, config.port, config.dbname);

        let mut pg_config = tokio_postgres::Config::new();
        pg_config.host(&config.host);
        pg_config.port(config.port);
        pg_config.user(&config.user);
        pg_config.password(&config.password);
        pg_config.dbname(&config.dbname);

        let tls_connector = TlsConnector::builder().build().context("Failed to build TLS connector")?;
        let tls = MakeTlsConnector::new(tls_connector);

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let mgr = Manager::from_config(pg_config, tls, mgr_config);

        let pool = Pool::builder(mgr)
            .max_size(config.max_size)
            .wait_timeout(config.timeouts.wait)
            .create_timeout(config.timeouts.create)
            .recycle_timeout(config.timeouts.recycle)
            .runtime(deadpool_postgres::Runtime::Tokio1)
            .build()
            .context("Failed to create database pool")?;

        let connection = Self { pool };
        connection.health_check().await?;
        tracing::info!("Database connection established");

        Ok(connection)
    }

    /// Create connection from database URL
    pub async fn from_url(url: &str) -> Result<Self> {
        let config = DatabaseConfig::from_url(url)?;
        Self::new(config).await
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Check database health
    pub async fn health_check(&self) -> Result<()> {
        let client = self.pool
            .get()
            .await
            .context("Failed to get connection for health check")?;

        client
            .query("SELECT 1", &[])
            .await
            .context("Database health check failed")?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for DatabaseConnection {
    async fn create_user(&self, user: NewUser) -> Result<StoredUser, StoreError> {
        let client = self.pool.get().await.context("Failed to get DB connection")?;
        let stored = user.into_stored();

        let inserted = client
            .execute(
                "INSERT INTO users (id, username, normalized_username, email, password_hash, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
                &[
                    &stored.id,
                    &stored.username,
                    &normalize_username(&stored.username),
                    &stored.email,
                    &stored.password_hash,
                    &stored.created_at,
                ],
            )
            .await;

        match inserted {
            Ok(_) => Ok(stored),
            Err(e) if e.code() == Some(&SqlState::UNIQUE_VIOLATION) => {
                Err(StoreError::DuplicateUsername(stored.username))
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to insert user").into()),
        }
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<StoredUser>, StoreError> {
        let client = self.pool.get().await.context("Failed to get DB connection")?;
        let row = client
            .query_opt(
                "SELECT id, username, email, password_hash, created_at FROM users WHERE normalized_username = $1",
                &[&normalize_username(username)],
            )
            .await
            .context("Failed to query user by username")?;

        row.map(|r| StoredUser::from_row(&r))
            .transpose()
            .context("Failed to decode user row")
            .map_err(StoreError::from)
    }
}
