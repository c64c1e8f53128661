//! Auth routes for registration, login, and user info

use axum::{
    extract::State,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use std::sync::Arc;

use crate::auth::jwt::TokenIssuer;
use crate::auth::middleware::AuthMiddleware;
use crate::auth::models::{AuthUser, IdentityError, LoginRequest, RegisterRequest, TokenResponse, UserIdentity};
use crate::auth::password::{check_password_policy, hash_password, verify_password};
use crate::database::{NewUser, StoreError};
use crate::errors::ApiError;
use crate::server::AppState;

const INVALID_CREDENTIALS: &str = "Invalid credentials";

pub async fn register(
    State(app_state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<&'static str>, ApiError> {
    let username = payload.username.trim().to_string();
    let email = payload.email.trim().to_string();

    let mut errors = check_registration(&username, &email);
    errors.extend(check_password_policy(&payload.password));
    if !errors.is_empty() {
        tracing::info!(%username, rejected = errors.len(), "registration rejected");
        return Err(ApiError::BadRequest(errors));
    }

    let password_hash = hash_password(&payload.password)?;
    let new_user = NewUser {
        username: username.clone(),
        email,
        password_hash,
    };

    match app_state.users.create_user(new_user).await {
        Ok(user) => {
            tracing::info!(username = %user.username, id = %user.id, "user registered");
            Ok(Json("User registered"))
        }
        Err(err @ StoreError::DuplicateUsername(_)) => Err(ApiError::BadRequest(vec![
            IdentityError::new("DuplicateUserName", err.to_string()),
        ])),
        Err(err) => Err(err.into()),
    }
}

pub async fn login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Some(user) = app_state.users.find_by_username(payload.username.trim()).await? else {
        tracing::info!(username = %payload.username, "login for unknown user");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    if !verify_password(&payload.password, &user.password_hash) {
        tracing::info!(username = %user.username, "login with wrong password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let token = app_state.issuer.issue_token(Some(&UserIdentity::from(&user)))?;
    Ok(Json(TokenResponse { token }))
}

/// Identity of the bearer of the request token.
pub async fn me(Extension(user): Extension<AuthUser>) -> Json<AuthUser> {
    Json(user)
}

fn check_registration(username: &str, email: &str) -> Vec<IdentityError> {
    let mut errors = Vec::new();

    let allowed = |c: char| c.is_ascii_alphanumeric() || "-._@+".contains(c);
    if username.is_empty() || !username.chars().all(allowed) {
        errors.push(IdentityError::new(
            "InvalidUserName",
            format!("Username '{username}' is invalid, can only contain letters or digits."),
        ));
    }
    if !email.is_empty() && !is_plausible_email(email) {
        errors.push(IdentityError::new("InvalidEmail", format!("Email '{email}' is invalid.")));
    }

    errors
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

pub fn create_auth_routes(issuer: Arc<TokenIssuer>) -> Router<AppState> {
    let protected = Router::new()
        .route("/api/auth/me", get(me))
        .layer(middleware::from_fn_with_state(issuer, AuthMiddleware::validate_token));

    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .merge(protected)
}
