//! Journal entry endpoints. Read-only; entries are immutable.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use quill_core::JournalEntry;

use crate::api_error::ApiError;
use crate::api_types::ListQuery;
use crate::extract::AuthUser;
use crate::AppState;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

pub async fn list_entries(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<JournalEntry>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = query.offset.unwrap_or(0).max(0);
    let mut tx = state.store.begin().await?;
    let entries = tx.list_entries_for_user(&user.id, limit, offset).await?;
    Ok(Json(entries))
}

pub async fn get_entry(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(entry_id): Path<String>,
) -> Result<Json<JournalEntry>, ApiError> {
    let mut tx = state.store.begin().await?;
    // A foreign user's entry reads as missing: 404, never 403.
    let entry = tx
        .get_entry_for_user(&user.id, &entry_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("journal entry not found".into()))?;
    Ok(Json(entry))
}
