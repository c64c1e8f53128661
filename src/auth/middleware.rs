//! Authentication Middleware
//!
//! Axum middleware for bearer token validation.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::auth::{jwt::TokenIssuer, models::AuthUser};

/// Authentication middleware that validates JWT tokens and injects user info
pub struct AuthMiddleware;

impl AuthMiddleware {
    /// Reject requests without a valid `Authorization: Bearer` token.
    pub async fn validate_token(
        State(issuer): State<Arc<TokenIssuer>>,
        mut req: Request,
        next: Next,
    ) -> Result<Response, StatusCode> {
        let token = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|header| header.to_str().ok())
            .and_then(|auth_header| auth_header.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty());

        let Some(token) = token else {
            tracing::debug!("Missing bearer token on {} {}", req.method(), req.uri());
            return Err(StatusCode::UNAUTHORIZED);
        };

        let claims = match issuer.validate_token(token) {
            Ok(data) => data.claims,
            Err(e) => {
                tracing::warn!("JWT validation failed: {}", e);
                return Err(StatusCode::UNAUTHORIZED);
            }
        };

        let auth_user = AuthUser {
            id: claims.name_id,
            username: claims.sub,
        };
        tracing::debug!(username = %auth_user.username, "authenticated request");

        req.extensions_mut().insert(auth_user);

        Ok(next.run(req).await)
    }
}
