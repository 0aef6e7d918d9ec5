//! Chat session rows.

use quill_core::ChatSession;
use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::error::StorageError;
use crate::store::{assert_user_scope, Tx};

const SESSION_COLUMNS: &str =
    "id, user_id, conversation_type, is_active, metadata, created_at, updated_at";

fn row_to_session(row: &PgRow) -> Result<ChatSession, StorageError> {
    Ok(ChatSession {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        conversation_type: row.try_get("conversation_type")?,
        is_active: row.try_get("is_active")?,
        metadata: row.try_get("metadata")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl Tx {
    pub async fn create_chat_session(&mut self, session: &ChatSession) -> Result<(), StorageError> {
        assert_user_scope(&session.user_id);
        sqlx::query(&format!(
            "INSERT INTO chat_sessions ({SESSION_COLUMNS}) VALUES ($1,$2,$3,$4,$5,$6,$7)"
        ))
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(&session.conversation_type)
        .bind(session.is_active)
        .bind(&session.metadata)
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(self.conn())
        .await?;
        Ok(())
    }

    /// Fetch one session, scoped to its owner. A session belonging to a
    /// different user is indistinguishable from a missing one.
    pub async fn get_session_for_user(
        &mut self,
        user_id: &str,
        session_id: &str,
    ) -> Result<Option<ChatSession>, StorageError> {
        assert_user_scope(user_id);
        let row = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE id = $1 AND user_id = $2"
        ))
        .bind(session_id)
        .bind(user_id)
        .fetch_optional(self.conn())
        .await?;
        row.map(|r| row_to_session(&r)).transpose()
    }

    /// All of a user's active sessions, most recently touched first.
    pub async fn list_sessions_for_user(
        &mut self,
        user_id: &str,
    ) -> Result<Vec<ChatSession>, StorageError> {
        assert_user_scope(user_id);
        let rows = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions
             WHERE user_id = $1 AND is_active
             ORDER BY updated_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.conn())
        .await?;
        rows.iter().map(row_to_session).collect()
    }

    /// Bump a session's updated_at, marking recent activity.
    pub async fn touch_session(&mut self, session_id: &str) -> Result<(), StorageError> {
        sqlx::query("UPDATE chat_sessions SET updated_at = NOW() WHERE id = $1")
            .bind(session_id)
            .execute(self.conn())
            .await?;
        Ok(())
    }
}
