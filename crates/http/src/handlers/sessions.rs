//! Chat session endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use quill_agent::catalogue_for;
use quill_core::{new_id, ChatMessage, ChatSession, DEFAULT_CONVERSATION_TYPE};

use crate::api_error::ApiError;
use crate::api_types::{SessionCreateRequest, SessionCreateResponse};
use crate::extract::AuthUser;
use crate::AppState;

pub async fn create_session(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(req): Json<SessionCreateRequest>,
) -> Result<Json<SessionCreateResponse>, ApiError> {
    let conversation_type =
        req.conversation_type.unwrap_or_else(|| DEFAULT_CONVERSATION_TYPE.to_owned());
    if catalogue_for(&conversation_type).is_none() {
        return Err(ApiError::BadRequest(format!(
            "unknown conversation type: {conversation_type}"
        )));
    }

    let session = ChatSession::new(
        new_id(),
        user.id,
        conversation_type,
        req.metadata.unwrap_or_else(|| serde_json::json!({})),
    );
    let mut tx = state.store.begin().await?;
    tx.create_chat_session(&session).await?;
    tx.commit().await?;

    Ok(Json(SessionCreateResponse {
        session_id: session.id,
        conversation_type: session.conversation_type,
        created_at: session.created_at,
    }))
}

pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<ChatSession>>, ApiError> {
    let mut tx = state.store.begin().await?;
    let sessions = tx.list_sessions_for_user(&user.id).await?;
    Ok(Json(sessions))
}

pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    let mut tx = state.store.begin().await?;
    tx.get_session_for_user(&user.id, &session_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("session not found".into()))?;
    let messages = tx.get_messages_ordered(&session_id).await?;
    Ok(Json(messages))
}
