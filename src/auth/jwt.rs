//! JWT Token Service
//!
//! Issues and validates the HS256 bearer tokens handed out on login.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::models::UserIdentity;
use crate::config::JwtSettings;

/// Shortest accepted HMAC secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum IssuanceError {
    #[error("no user identity supplied")]
    MissingIdentity,
    #[error("user identity is missing `{0}`")]
    MissingField(&'static str),
    #[error("JWT secret key is not configured")]
    MissingSecret,
    #[error("JWT secret key is {len} bytes, at least 32 required")]
    SecretTooShort { len: usize },
    #[error("JWT expiry minutes `{0}` is not a positive number")]
    InvalidExpiryFormat(String),
    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("invalid token: {0}")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
}

/// JWT Claims structure containing user information and token metadata
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Username
    pub sub: String,
    /// User unique identifier, under the claim name existing consumers read
    #[serde(rename = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/nameidentifier")]
    pub name_id: String,
    /// Unique token id, fresh per issuance
    pub jti: String,
    /// Token issued at timestamp
    pub iat: i64,
    /// Token expiration timestamp
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

/// Signing parameters after parsing and validation.
#[derive(Debug, Clone)]
pub struct SigningConfig {
    secret: Vec<u8>,
    pub issuer: String,
    pub audience: String,
    pub expiry: Duration,
}

impl SigningConfig {
    /// Resolve raw settings. Expiry is checked before the secret.
    pub fn resolve(settings: &JwtSettings) -> Result<Self, IssuanceError> {
        let raw_expiry = settings.expiry_minutes.as_deref().unwrap_or_default();
        let minutes: f64 = raw_expiry
            .trim()
            .parse()
            .map_err(|_| IssuanceError::InvalidExpiryFormat(raw_expiry.to_string()))?;
        let expiry = expiry_from_minutes(minutes)
            .ok_or_else(|| IssuanceError::InvalidExpiryFormat(raw_expiry.to_string()))?;

        let secret = match settings.secret_key.as_deref() {
            Some(secret) if !secret.is_empty() => secret.as_bytes().to_vec(),
            _ => return Err(IssuanceError::MissingSecret),
        };
        if secret.len() < MIN_SECRET_LEN {
            return Err(IssuanceError::SecretTooShort { len: secret.len() });
        }

        Ok(Self {
            secret,
            issuer: settings.issuer.clone().unwrap_or_default(),
            audience: settings.audience.clone().unwrap_or_default(),
            expiry,
        })
    }

    fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(&self.secret)
    }

    fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(&self.secret)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.leeway = 0;
        validation
    }
}

/// Token issuer holding the signing settings read at startup.
///
/// Settings are resolved on every call, so a misconfigured issuer fails each
/// issuance with the same error. `server::start` resolves them once up front
/// to refuse startup instead.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    settings: JwtSettings,
}

impl TokenIssuer {
    pub fn new(settings: JwtSettings) -> Self {
        Self { settings }
    }

    /// Generate a signed token asserting `identity`.
    pub fn issue_token(&self, identity: Option<&UserIdentity>) -> Result<String, IssuanceError> {
        let identity = identity.ok_or(IssuanceError::MissingIdentity)?;
        let username = present(identity.username.as_deref()).ok_or(IssuanceError::MissingField("username"))?;
        let user_id = present(identity.id.as_deref()).ok_or(IssuanceError::MissingField("id"))?;

        let config = SigningConfig::resolve(&self.settings)?;

        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(config.expiry)
            .ok_or_else(|| IssuanceError::InvalidExpiryFormat(self.settings.expiry_minutes.clone().unwrap_or_default()))?;
        let claims = Claims {
            sub: username.to_string(),
            name_id: user_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: config.issuer.clone(),
            aud: config.audience.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &config.encoding_key())
            .map_err(IssuanceError::Signing)?;
        tracing::debug!(username = %claims.sub, jti = %claims.jti, "issued access token");
        Ok(token)
    }

    /// Validate signature, issuer, audience and expiry of a token.
    pub fn validate_token(&self, token: &str) -> Result<TokenData<Claims>, IssuanceError> {
        let config = SigningConfig::resolve(&self.settings)?;
        decode::<Claims>(token, &config.decoding_key(), &config.validation())
            .map_err(IssuanceError::InvalidToken)
    }
}

/// Positive, non-zero lifetime that still yields a representable expiry instant.
fn expiry_from_minutes(minutes: f64) -> Option<Duration> {
    if !minutes.is_finite() || minutes <= 0.0 {
        return None;
    }
    let millis = (minutes * 60_000.0).round();
    if millis < 1.0 || millis >= i64::MAX as f64 {
        return None;
    }
    let expiry = Duration::try_milliseconds(millis as i64)?;
    Utc::now().checked_add_signed(expiry)?;
    Some(expiry)
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    const TEST_SECRET_KEY: &str = "TestSecretKey1234567890TestSecretKey1234567890";
    const TEST_ISSUER: &str = "TestWarehouseAPI";
    const TEST_AUDIENCE: &str = "TestWarehouseClients";
    const TEST_EXPIRY_MINUTES: &str = "30";
    const NAME_IDENTIFIER_CLAIM: &str =
        "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/nameidentifier";

    fn settings() -> JwtSettings {
        JwtSettings {
            secret_key: Some(TEST_SECRET_KEY.to_string()),
            issuer: Some(TEST_ISSUER.to_string()),
            audience: Some(TEST_AUDIENCE.to_string()),
            expiry_minutes: Some(TEST_EXPIRY_MINUTES.to_string()),
        }
    }

    fn identity(username: Option<&str>, id: Option<&str>) -> UserIdentity {
        UserIdentity {
            id: id.map(str::to_string),
            username: username.map(str::to_string),
            email: Some("test@example.com".to_string()),
        }
    }

    fn payload(token: &str) -> serde_json::Value {
        let segment = token.split('.').nth(1).unwrap();
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(segment).unwrap()).unwrap()
    }

    #[test]
    fn test_token_has_three_segments() {
        let issuer = TokenIssuer::new(settings());
        let token = issuer.issue_token(Some(&identity(Some("testuser"), Some("user123")))).unwrap();

        assert!(!token.is_empty());
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn test_token_carries_identity_claims() {
        let issuer = TokenIssuer::new(settings());
        let token = issuer.issue_token(Some(&identity(Some("testuser"), Some("user123")))).unwrap();

        let body = payload(&token);
        assert_eq!(body["sub"], "testuser");
        assert_eq!(body[NAME_IDENTIFIER_CLAIM], "user123");
        let jti = body["jti"].as_str().unwrap();
        assert!(Uuid::parse_str(jti).is_ok());
    }

    #[test]
    fn test_header_is_hs256() {
        let issuer = TokenIssuer::new(settings());
        let token = issuer.issue_token(Some(&identity(Some("testuser"), Some("user123")))).unwrap();

        let header = token.split('.').next().unwrap();
        let header: serde_json::Value = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(header).unwrap()).unwrap();
        assert_eq!(header["alg"], "HS256");
        assert_eq!(header["typ"], "JWT");
    }

    #[test]
    fn test_issuer_and_audience() {
        let issuer = TokenIssuer::new(settings());
        let token = issuer.issue_token(Some(&identity(Some("testuser"), Some("user123")))).unwrap();

        let body = payload(&token);
        assert_eq!(body["iss"], TEST_ISSUER);
        assert_eq!(body["aud"], TEST_AUDIENCE);
    }

    #[test]
    fn test_expiration_matches_configured_minutes() {
        let issuer = TokenIssuer::new(settings());
        let before = Utc::now();
        let token = issuer.issue_token(Some(&identity(Some("testuser"), Some("user123")))).unwrap();

        let claims = issuer.validate_token(&token).unwrap().claims;
        let expected = (before + Duration::minutes(30)).timestamp();
        assert!((claims.exp - expected).abs() < 60, "exp {} expected ~{}", claims.exp, expected);
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn test_fractional_expiry_minutes() {
        let mut settings = settings();
        settings.expiry_minutes = Some("1.5".to_string());
        let config = SigningConfig::resolve(&settings).unwrap();

        assert_eq!(config.expiry, Duration::seconds(90));
    }

    #[test]
    fn test_same_user_gets_distinct_tokens() {
        let issuer = TokenIssuer::new(settings());
        let user = identity(Some("testuser"), Some("user123"));

        let first = issuer.issue_token(Some(&user)).unwrap();
        let second = issuer.issue_token(Some(&user)).unwrap();

        assert_ne!(first, second);
        assert_ne!(payload(&first)["jti"], payload(&second)["jti"]);
    }

    #[test]
    fn test_different_users_get_distinct_tokens() {
        let issuer = TokenIssuer::new(settings());

        let first = issuer.issue_token(Some(&identity(Some("user1"), Some("id1")))).unwrap();
        let second = issuer.issue_token(Some(&identity(Some("user2"), Some("id2")))).unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_token_validates_with_same_key() {
        let issuer = TokenIssuer::new(settings());
        let token = issuer.issue_token(Some(&identity(Some("testuser"), Some("user123")))).unwrap();

        let data = issuer.validate_token(&token).unwrap();
        assert_eq!(data.claims.sub, "testuser");
        assert_eq!(data.claims.name_id, "user123");
        assert_eq!(data.header.alg, Algorithm::HS256);
    }

    #[test]
    fn test_token_rejected_with_other_key() {
        let issuer = TokenIssuer::new(settings());
        let token = issuer.issue_token(Some(&identity(Some("testuser"), Some("user123")))).unwrap();

        let mut other = settings();
        other.secret_key = Some("AnotherSecretKey1234567890AnotherSecretKey".to_string());
        let err = TokenIssuer::new(other).validate_token(&token).unwrap_err();
        assert!(matches!(err, IssuanceError::InvalidToken(_)));
    }

    #[test]
    fn test_token_rejected_for_other_audience() {
        let issuer = TokenIssuer::new(settings());
        let token = issuer.issue_token(Some(&identity(Some("testuser"), Some("user123")))).unwrap();

        let mut other = settings();
        other.audience = Some("SomeoneElse".to_string());
        assert!(TokenIssuer::new(other).validate_token(&token).is_err());
    }

    #[test]
    fn test_various_valid_users() {
        let issuer = TokenIssuer::new(settings());
        let users = [
            ("user1", "id1"),
            ("admin", "admin123"),
            ("test.user", "testid456"),
        ];

        for (username, id) in users {
            let token = issuer.issue_token(Some(&identity(Some(username), Some(id)))).unwrap();
            let body = payload(&token);
            assert_eq!(body["sub"], username);
            assert_eq!(body[NAME_IDENTIFIER_CLAIM], id);
        }
    }

    #[test]
    fn test_missing_identity() {
        let issuer = TokenIssuer::new(settings());
        assert!(matches!(issuer.issue_token(None), Err(IssuanceError::MissingIdentity)));
    }

    #[test]
    fn test_missing_username() {
        let issuer = TokenIssuer::new(settings());
        let err = issuer.issue_token(Some(&identity(None, Some("user123")))).unwrap_err();
        assert!(matches!(err, IssuanceError::MissingField("username")));

        let err = issuer.issue_token(Some(&identity(Some(""), Some("user123")))).unwrap_err();
        assert!(matches!(err, IssuanceError::MissingField("username")));
    }

    #[test]
    fn test_missing_id() {
        let issuer = TokenIssuer::new(settings());
        let err = issuer.issue_token(Some(&identity(Some("testuser"), None))).unwrap_err();
        assert!(matches!(err, IssuanceError::MissingField("id")));

        let err = issuer.issue_token(Some(&identity(Some("testuser"), Some("")))).unwrap_err();
        assert!(matches!(err, IssuanceError::MissingField("id")));
    }

    #[test]
    fn test_missing_secret_key() {
        let mut settings = settings();
        settings.secret_key = None;
        let issuer = TokenIssuer::new(settings);

        let err = issuer.issue_token(Some(&identity(Some("testuser"), Some("user123")))).unwrap_err();
        assert!(matches!(err, IssuanceError::MissingSecret));
    }

    #[test]
    fn test_short_secret_key() {
        let mut settings = settings();
        settings.secret_key = Some("too-short".to_string());
        let issuer = TokenIssuer::new(settings);

        let err = issuer.issue_token(Some(&identity(Some("testuser"), Some("user123")))).unwrap_err();
        assert!(matches!(err, IssuanceError::SecretTooShort { len: 9 }));
    }

    #[test]
    fn test_invalid_expiry_minutes() {
        for raw in ["invalid", "", "-5", "0", "NaN", "inf", "1e12", "0.000001"] {
            let mut settings = settings();
            settings.expiry_minutes = Some(raw.to_string());
            let issuer = TokenIssuer::new(settings);

            let err = issuer.issue_token(Some(&identity(Some("testuser"), Some("user123")))).unwrap_err();
            assert!(matches!(err, IssuanceError::InvalidExpiryFormat(_)), "accepted `{raw}`");
        }
    }

    #[test]
    fn test_large_expiry_fails_resolve() {
        let mut settings = settings();
        settings.expiry_minutes = Some("1e12".to_string());

        let err = SigningConfig::resolve(&settings).unwrap_err();
        assert!(matches!(err, IssuanceError::InvalidExpiryFormat(raw) if raw == "1e12"));
    }

    #[test]
    fn test_expired_token_rejected() {
        let issuer = TokenIssuer::new(settings());
        let now = Utc::now();
        let claims = Claims {
            sub: "testuser".to_string(),
            name_id: "user123".to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: (now - Duration::minutes(31)).timestamp(),
            exp: (now - Duration::minutes(1)).timestamp(),
            iss: TEST_ISSUER.to_string(),
            aud: TEST_AUDIENCE.to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET_KEY.as_bytes()),
        )
        .unwrap();

        let err = issuer.validate_token(&token).unwrap_err();
        match err {
            IssuanceError::InvalidToken(inner) => assert!(
                matches!(inner.kind(), jsonwebtoken::errors::ErrorKind::ExpiredSignature),
                "unexpected error kind: {inner:?}"
            ),
            other => panic!("expected InvalidToken, got {other:?}"),
        }
    }

    #[test]
    fn test_expiry_checked_before_secret() {
        let settings = JwtSettings {
            secret_key: None,
            issuer: None,
            audience: None,
            expiry_minutes: Some("invalid".to_string()),
        };
        let err = SigningConfig::resolve(&settings).unwrap_err();
        assert!(matches!(err, IssuanceError::InvalidExpiryFormat(_)));
    }
}
