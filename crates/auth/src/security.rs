//! Password hashing and bearer token primitives.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::error::AuthError;

/// Claims embedded in access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject, the user id (standard `sub` claim).
    pub sub: String,
    /// Username at issue time.
    pub username: String,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Issued at (unix timestamp).
    pub iat: i64,
}

/// Hash a password with bcrypt at the default cost.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    Ok(bcrypt::hash(password, bcrypt::DEFAULT_COST)?)
}

/// Verify a password against its bcrypt hash.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AuthError> {
    Ok(bcrypt::verify(password, password_hash)?)
}

/// SHA-256 digest of a token, hex-encoded. This is what gets persisted;
/// the token itself never touches the database.
#[must_use]
pub fn token_digest(token: &str) -> String {
    use std::fmt::Write as _;

    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Issue a signed access token. Returns the token and its expiry.
pub fn issue_token(
    secret: &str,
    user_id: &str,
    username: &str,
    ttl: Duration,
) -> Result<(String, DateTime<Utc>), AuthError> {
    let now = Utc::now();
    let expires_at = now + ttl;
    let claims = TokenClaims {
        sub: user_id.to_owned(),
        username: username.to_owned(),
        exp: expires_at.timestamp(),
        iat: now.timestamp(),
    };
    let token = jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(AuthError::TokenEncoding)?;
    Ok((token, expires_at))
}

/// Decode and validate a token's signature and expiry.
pub fn decode_token(secret: &str, token: &str) -> Result<TokenClaims, AuthError> {
    jsonwebtoken::decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AuthError::InvalidToken)
}
