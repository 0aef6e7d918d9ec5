//! Bearer-token authentication extractor.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use quill_core::User;

use crate::api_error::ApiError;
use crate::AppState;

/// The authenticated user behind the request's `Authorization: Bearer`
/// header. Handlers taking this reject unauthenticated requests with 401.
pub struct AuthUser(pub User);

/// The raw bearer token, for endpoints that operate on the token itself
/// (logout).
pub struct BearerToken(pub String);

fn bearer_token(parts: &Parts) -> Result<String, ApiError> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(ToOwned::to_owned)
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".into()))
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for BearerToken {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        bearer_token(parts).map(Self)
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let mut tx = state.store.begin().await?;
        let user = state.auth.authenticate(&mut tx, &token).await?;
        Ok(Self(user))
    }
}
