//! Typed API error for HTTP handlers.
//!
//! Maps the error taxonomy onto status codes and a JSON body of
//! `{"code": ..., "error": ...}`. Internal failures are logged with a
//! correlation id and answered with a generic message; no raw error text
//! reaches the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use quill_agent::AgentError;
use quill_auth::AuthError;
use quill_storage::StorageError;

/// API error with HTTP status code and user-safe message.
///
/// Use via `Result<Json<T>, ApiError>` in handlers.
#[derive(Debug)]
pub enum ApiError {
    /// 400: malformed input, missing field, invalid enum.
    BadRequest(String),
    /// 401: missing or invalid token.
    Unauthorized(String),
    /// 403: token valid but access not allowed.
    Forbidden(String),
    /// 404: user-scoped lookup produced no row.
    NotFound(String),
    /// 409: precondition violation (duplicate username, reorder invariant).
    Conflict(String),
    /// 503: LLM transport failure or timeout.
    Upstream(String),
    /// 500: everything else. Details logged, not exposed.
    Internal(anyhow::Error),
}

impl ApiError {
    const fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "validation_error",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Upstream(_) => "upstream_unavailable",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::Upstream(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            Self::Internal(err) => {
                let correlation_id = quill_core::new_id();
                tracing::error!(error = ?err, correlation_id, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, format!("internal error ({correlation_id})"))
            },
        };
        let body = serde_json::json!({"code": code, "error": message});
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { entity, id } => {
                Self::NotFound(format!("{entity} '{id}' not found"))
            },
            StorageError::Duplicate(msg) | StorageError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Internal(other.into()),
        }
    }
}

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::NotFound(what) => Self::NotFound(format!("{what} not found")),
            AgentError::InvalidInput(msg) => Self::BadRequest(msg),
            AgentError::Conflict(msg) => Self::Conflict(msg),
            AgentError::Storage(e) => e.into(),
            AgentError::Llm(e) => {
                tracing::warn!(error = %e, "LLM upstream failure");
                Self::Upstream("language model temporarily unavailable".into())
            },
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::Unauthorized("invalid credentials".into()),
            AuthError::InvalidToken => Self::Unauthorized("invalid or expired token".into()),
            AuthError::Validation(msg) => Self::BadRequest(msg),
            AuthError::Conflict(msg) => Self::Conflict(msg),
            AuthError::Storage(e) => e.into(),
            other => Self::Internal(other.into()),
        }
    }
}
