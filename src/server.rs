//! # Server Module
//!
//! HTTP server setup and route configuration.

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::auth::jwt::{SigningConfig, TokenIssuer};
use crate::config::Config;
use crate::database::{migrations, DatabaseConnection, InMemoryUserStore, UserStore};
use crate::routes::{auth, health::ping};

/// Application state shared across all route handlers
#[derive(Clone)]
pub struct AppState {
    pub issuer: Arc<TokenIssuer>,
    pub users: Arc<dyn UserStore>,
}

/// Assemble the application router around `state`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .merge(auth::create_auth_routes(state.issuer.clone()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Starts the HTTP server and serves until the process is stopped.
pub async fn start(config: Config) -> Result<()> {
    // Fail at startup rather than on the first login.
    let signing = SigningConfig::resolve(&config.jwt).context("Invalid JWT settings")?;
    tracing::info!(
        issuer = %signing.issuer,
        audience = %signing.audience,
        expiry_secs = signing.expiry.num_seconds(),
        "JWT signing configured"
    );
    let issuer = Arc::new(TokenIssuer::new(config.jwt));

    let users: Arc<dyn UserStore> = match &config.database_url {
        Some(url) => {
            let db = DatabaseConnection::from_url(url).await?;
            migrations::run_migrations(db.pool()).await?;
            Arc::new(db)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, users are kept in memory and lost on restart");
            Arc::new(InMemoryUserStore::new())
        }
    };

    let app = build_router(AppState { issuer, users });

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr} - port may already be in use"))?;

    tracing::info!("Listening on http://{}", addr);
    tracing::info!("Health check available at http://{}/ping", addr);
    tracing::info!("Auth endpoints available at http://{}/api/auth/*", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
