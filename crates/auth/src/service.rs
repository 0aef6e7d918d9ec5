//! Registration, login, logout, and request authentication.

use chrono::{Duration, Utc};
use quill_core::{new_id, validate_username, AuthSession, User};
use quill_storage::Tx;

use crate::error::AuthError;
use crate::security::{
    decode_token, hash_password, issue_token, token_digest, verify_password,
};

const PASSWORD_MIN_LEN: usize = 4;

/// A freshly issued login.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in: i64,
    pub user_id: String,
    pub username: String,
}

/// Stateless auth operations over the store. Construct once at startup.
#[derive(Debug, Clone)]
pub struct AuthService {
    jwt_secret: String,
    token_ttl: Duration,
}

impl AuthService {
    #[must_use]
    pub fn new(jwt_secret: String, token_ttl_hours: i64) -> Self {
        Self { jwt_secret, token_ttl: Duration::hours(token_ttl_hours) }
    }

    /// Register a new user.
    ///
    /// # Errors
    /// `Validation` on bad input, `Conflict` when the username or email is
    /// already registered.
    pub async fn register(
        &self,
        tx: &mut Tx,
        username: &str,
        email: Option<&str>,
        password: &str,
    ) -> Result<User, AuthError> {
        validate_username(username).map_err(|e| AuthError::Validation(e.to_string()))?;
        if password.chars().count() < PASSWORD_MIN_LEN {
            return Err(AuthError::Validation(format!(
                "password must be at least {PASSWORD_MIN_LEN} characters"
            )));
        }

        if tx.get_user_by_username(username).await?.is_some() {
            return Err(AuthError::Conflict("username already exists".into()));
        }
        if let Some(email) = email {
            if tx.get_user_by_email(email).await?.is_some() {
                return Err(AuthError::Conflict("email already exists".into()));
            }
        }

        let user = User::new(
            new_id(),
            username.to_owned(),
            email.map(ToOwned::to_owned),
            hash_password(password)?,
        );
        tx.create_user(&user).await.map_err(|e| {
            // Unique index race: a concurrent register of the same name.
            if e.is_duplicate() {
                AuthError::Conflict("username already exists".into())
            } else {
                AuthError::Storage(e)
            }
        })?;
        tracing::info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(user)
    }

    /// Authenticate credentials and issue a bearer token, recording an auth
    /// session with the token's digest.
    pub async fn login(
        &self,
        tx: &mut Tx,
        username: &str,
        password: &str,
        user_agent: Option<&str>,
        ip_address: Option<&str>,
    ) -> Result<IssuedToken, AuthError> {
        let user = tx
            .get_user_by_username(username)
            .await?
            .filter(|u| u.is_active)
            .ok_or(AuthError::InvalidCredentials)?;
        if !verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        let (access_token, expires_at) =
            issue_token(&self.jwt_secret, &user.id, &user.username, self.token_ttl)?;
        let session = AuthSession {
            id: new_id(),
            user_id: user.id.clone(),
            token_hash: token_digest(&access_token),
            expires_at,
            revoked: false,
            user_agent: user_agent.map(ToOwned::to_owned),
            ip_address: ip_address.map(ToOwned::to_owned),
            created_at: Utc::now(),
        };
        tx.create_auth_session(&session).await?;
        tracing::info!(user_id = %user.id, "login");

        Ok(IssuedToken {
            access_token,
            expires_in: self.token_ttl.num_seconds(),
            user_id: user.id,
            username: user.username,
        })
    }

    /// Resolve a bearer token to its user. Both the signature and the stored
    /// auth session must check out.
    pub async fn authenticate(&self, tx: &mut Tx, token: &str) -> Result<User, AuthError> {
        let claims = decode_token(&self.jwt_secret, token)?;
        let session = tx
            .get_auth_session_by_token_hash(&token_digest(token))
            .await?
            .filter(|s| s.is_valid(Utc::now()))
            .ok_or(AuthError::InvalidToken)?;
        if session.user_id != claims.sub {
            return Err(AuthError::InvalidToken);
        }
        tx.get_user_by_id(&claims.sub)
            .await?
            .filter(|u| u.is_active)
            .ok_or(AuthError::InvalidToken)
    }

    /// Revoke the auth session behind a token. Idempotent.
    pub async fn logout(&self, tx: &mut Tx, token: &str) -> Result<bool, AuthError> {
        Ok(tx.revoke_auth_session(&token_digest(token)).await?)
    }
}
