//! Configuration module for environment variables and application settings

use std::env;
use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres URL; `None` selects the in-memory user store
    pub database_url: Option<String>,

    /// Server configuration
    pub server: ServerConfig,

    /// Token signing settings
    pub jwt: JwtSettings,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Raw `JwtSettings:*` values, validated when a token is signed.
#[derive(Debug, Clone, Default)]
pub struct JwtSettings {
    pub secret_key: Option<String>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    pub expiry_minutes: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup, e.g. a map in tests.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(port) => port.parse().with_context(|| format!("PORT `{port}` is not a valid port"))?,
            None => 3000,
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),

            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port,
            },

            jwt: JwtSettings {
                secret_key: lookup("JWT_SECRET_KEY"),
                issuer: lookup("JWT_ISSUER"),
                audience: lookup("JWT_AUDIENCE"),
                expiry_minutes: lookup("JWT_EXPIRY_MINUTES"),
            },
        })
    }
}
