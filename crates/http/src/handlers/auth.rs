//! Registration, login, identity, logout.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::USER_AGENT;
use axum::http::HeaderMap;
use axum::Json;

use crate::api_error::ApiError;
use crate::api_types::{
    LoginRequest, LoginResponse, MeResponse, MessageResponse, RegisterRequest, RegisterResponse,
};
use crate::extract::{AuthUser, BearerToken};
use crate::AppState;

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let mut tx = state.store.begin().await?;
    let user = state
        .auth
        .register(&mut tx, &req.username, req.email.as_deref(), &req.password)
        .await?;
    tx.commit().await?;
    Ok(Json(RegisterResponse { user_id: user.id, username: user.username }))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user_agent = headers.get(USER_AGENT).and_then(|v| v.to_str().ok());
    let mut tx = state.store.begin().await?;
    let issued =
        state.auth.login(&mut tx, &req.username, &req.password, user_agent, None).await?;
    tx.commit().await?;
    Ok(Json(LoginResponse {
        access_token: issued.access_token,
        token_type: "bearer",
        expires_in: issued.expires_in,
        user_id: issued.user_id,
        username: issued.username,
    }))
}

pub async fn me(AuthUser(user): AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: user.id,
        username: user.username,
        email: user.email,
        is_verified: user.is_verified,
        created_at: user.created_at,
    })
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
    BearerToken(token): BearerToken,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut tx = state.store.begin().await?;
    state.auth.logout(&mut tx, &token).await?;
    tx.commit().await?;
    Ok(Json(MessageResponse { message: "logged out".into() }))
}
