//! The chat turn endpoint.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use quill_agent::ChatTurn;

use crate::api_error::ApiError;
use crate::api_types::ChatRequest;
use crate::extract::AuthUser;
use crate::AppState;

pub async fn chat(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(session_id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatTurn>, ApiError> {
    let turn = state.runtime.chat(&user.id, &session_id, &req.text, req.metadata).await?;
    Ok(Json(turn))
}
