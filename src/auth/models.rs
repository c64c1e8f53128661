//! Authentication Models
//!
//! Data structures for authentication requests, responses, and user information.

use serde::{Deserialize, Serialize};

use crate::database::StoredUser;

/// Identity record handed to the token issuer after a credential check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
}

impl From<&StoredUser> for UserIdentity {
    fn from(user: &StoredUser) -> Self {
        Self {
            id: Some(user.id.clone()),
            username: Some(user.username.clone()),
            email: user.email.clone(),
        }
    }
}

/// Authenticated user information extracted from JWT
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
}

/// Registration request payload
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(alias = "Username")]
    pub username: String,
    #[serde(alias = "Email")]
    pub email: String,
    #[serde(alias = "Password")]
    pub password: String,
}

/// Login request payload
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "Username")]
    pub username: String,
    #[serde(alias = "Password")]
    pub password: String,
}

/// Token response after successful authentication
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub struct TokenResponse {
    pub token: String,
}

/// One failed registration rule.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[cfg_attr(test, derive(Deserialize))]
pub struct IdentityError {
    pub code: String,
    pub description: String,
}

impl IdentityError {
    pub fn new(code: &str, description: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            description: description.into(),
        }
    }
}
