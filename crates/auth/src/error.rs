//! Typed error enum for the auth layer.

use quill_storage::StorageError;
use thiserror::Error;

/// Errors from registration, login, and token validation.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown username or wrong password. Deliberately indistinct.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Token missing, malformed, expired, revoked, or user inactive.
    #[error("invalid or expired token")]
    InvalidToken,

    /// Input failed validation (username length, empty password).
    #[error("invalid input: {0}")]
    Validation(String),

    /// Username or email already registered.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Storage failure underneath an auth operation.
    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    /// Password hashing failure.
    #[error("password hashing: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    /// Token encoding failure. Decoding failures map to `InvalidToken`.
    #[error("token encoding: {0}")]
    TokenEncoding(jsonwebtoken::errors::Error),
}
