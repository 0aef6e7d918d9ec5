//! Journal entry rows. Insert-only; entries are immutable once written.

use quill_core::JournalEntry;
use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::decode_draft_data;
use crate::error::StorageError;
use crate::store::{assert_user_scope, Tx};

const ENTRY_COLUMNS: &str =
    "id, user_id, session_id, title, structured_data, raw_text, metadata, created_at";

fn row_to_entry(row: &PgRow) -> Result<JournalEntry, StorageError> {
    Ok(JournalEntry {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        session_id: row.try_get("session_id")?,
        title: row.try_get("title")?,
        structured_data: decode_draft_data("structured_data", row.try_get("structured_data")?)?,
        raw_text: row.try_get("raw_text")?,
        metadata: row.try_get("metadata")?,
        created_at: row.try_get("created_at")?,
    })
}

impl Tx {
    pub async fn insert_entry(&mut self, entry: &JournalEntry) -> Result<(), StorageError> {
        assert_user_scope(&entry.user_id);
        sqlx::query(&format!(
            "INSERT INTO journal_entries ({ENTRY_COLUMNS}) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)"
        ))
        .bind(&entry.id)
        .bind(&entry.user_id)
        .bind(&entry.session_id)
        .bind(&entry.title)
        .bind(serde_json::Value::Object(entry.structured_data.clone()))
        .bind(&entry.raw_text)
        .bind(&entry.metadata)
        .bind(entry.created_at)
        .execute(self.conn())
        .await?;
        Ok(())
    }

    /// A user's entries, newest first.
    pub async fn list_entries_for_user(
        &mut self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<JournalEntry>, StorageError> {
        assert_user_scope(user_id);
        let rows = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM journal_entries
             WHERE user_id = $1
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.conn())
        .await?;
        rows.iter().map(row_to_entry).collect()
    }

    /// One entry, scoped to its owner. A foreign entry reads as missing.
    pub async fn get_entry_for_user(
        &mut self,
        user_id: &str,
        entry_id: &str,
    ) -> Result<Option<JournalEntry>, StorageError> {
        assert_user_scope(user_id);
        let row = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM journal_entries WHERE id = $1 AND user_id = $2"
        ))
        .bind(entry_id)
        .bind(user_id)
        .fetch_optional(self.conn())
        .await?;
        row.map(|r| row_to_entry(&r)).transpose()
    }

    /// Number of entries a session has produced.
    pub async fn count_entries_for_session(
        &mut self,
        session_id: &str,
    ) -> Result<i64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM journal_entries WHERE session_id = $1")
            .bind(session_id)
            .fetch_one(self.conn())
            .await?;
        Ok(row.try_get("n")?)
    }
}
