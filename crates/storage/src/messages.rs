//! Chat message rows. Append-only.

use std::str::FromStr as _;

use quill_core::{ChatMessage, MessageRole};
use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::error::StorageError;
use crate::store::Tx;

const MESSAGE_COLUMNS: &str = "id, session_id, role, content, metadata, created_at";

fn row_to_message(row: &PgRow) -> Result<ChatMessage, StorageError> {
    let role_str: String = row.try_get("role")?;
    let role = MessageRole::from_str(&role_str).unwrap_or_else(|_| {
        tracing::warn!(invalid_role = %role_str, "corrupt message role in DB, defaulting to user");
        MessageRole::User
    });
    Ok(ChatMessage {
        id: row.try_get("id")?,
        session_id: row.try_get("session_id")?,
        role,
        content: row.try_get("content")?,
        metadata: row.try_get("metadata")?,
        created_at: row.try_get("created_at")?,
    })
}

impl Tx {
    pub async fn insert_message(&mut self, message: &ChatMessage) -> Result<(), StorageError> {
        sqlx::query(&format!(
            "INSERT INTO chat_messages ({MESSAGE_COLUMNS}) VALUES ($1,$2,$3,$4,$5,$6)"
        ))
        .bind(&message.id)
        .bind(&message.session_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(&message.metadata)
        .bind(message.created_at)
        .execute(self.conn())
        .await?;
        Ok(())
    }

    /// Full history for a session in `(created_at, id)` ascending order.
    /// The id tiebreak keeps the order stable for same-instant rows.
    pub async fn get_messages_ordered(
        &mut self,
        session_id: &str,
    ) -> Result<Vec<ChatMessage>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages
             WHERE session_id = $1
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(session_id)
        .fetch_all(self.conn())
        .await?;
        rows.iter().map(row_to_message).collect()
    }

    /// Number of messages in a session.
    pub async fn count_messages(&mut self, session_id: &str) -> Result<i64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM chat_messages WHERE session_id = $1")
            .bind(session_id)
            .fetch_one(self.conn())
            .await?;
        Ok(row.try_get("n")?)
    }

    /// Concatenated user-authored text of a session, oldest first. Snapshotted
    /// into entries as the raw text behind the structured data.
    pub async fn get_session_raw_text(&mut self, session_id: &str) -> Result<String, StorageError> {
        let rows = sqlx::query(
            "SELECT content FROM chat_messages
             WHERE session_id = $1 AND role = 'user'
             ORDER BY created_at ASC, id ASC",
        )
        .bind(session_id)
        .fetch_all(self.conn())
        .await?;
        let parts: Vec<String> =
            rows.iter().map(|r| r.try_get::<String, _>("content")).collect::<Result<_, _>>()?;
        Ok(parts.join("\n\n"))
    }
}
