//! Password hashing and password policy

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::auth::models::IdentityError;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Hash a password into an Argon2 PHC string.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))
}

/// Check a password against a stored hash. Unparseable hashes never match.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(e) => {
            tracing::warn!("Stored password hash is malformed: {}", e);
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Every policy rule the password breaks; empty when it is acceptable.
pub fn check_password_policy(password: &str) -> Vec<IdentityError> {
    let mut errors = Vec::new();

    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(IdentityError::new(
            "PasswordTooShort",
            format!("Passwords must be at least {MIN_PASSWORD_LEN} characters."),
        ));
    }
    if !password.chars().any(|c| !c.is_alphanumeric()) {
        errors.push(IdentityError::new(
            "PasswordRequiresNonAlphanumeric",
            "Passwords must have at least one non alphanumeric character.",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push(IdentityError::new(
            "PasswordRequiresDigit",
            "Passwords must have at least one digit ('0'-'9').",
        ));
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        errors.push(IdentityError::new(
            "PasswordRequiresLower",
            "Passwords must have at least one lowercase ('a'-'z').",
        ));
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        errors.push(IdentityError::new(
            "PasswordRequiresUpper",
            "Passwords must have at least one uppercase ('A'-'Z').",
        ));
    }

    errors
}
