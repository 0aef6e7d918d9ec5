//! Journal draft rows. One per session, created lazily.

use quill_core::{new_id, DraftData, JournalDraft};
use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::decode_draft_data;
use crate::error::StorageError;
use crate::store::{assert_user_scope, Tx};

const DRAFT_COLUMNS: &str =
    "id, session_id, user_id, draft_data, raw_text, is_finalized, created_at, updated_at";

fn row_to_draft(row: &PgRow) -> Result<JournalDraft, StorageError> {
    Ok(JournalDraft {
        id: row.try_get("id")?,
        session_id: row.try_get("session_id")?,
        user_id: row.try_get("user_id")?,
        draft_data: decode_draft_data("draft_data", row.try_get("draft_data")?)?,
        raw_text: row.try_get("raw_text")?,
        is_finalized: row.try_get("is_finalized")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl Tx {
    /// Fetch the session's draft, creating an empty one if none exists.
    /// The `session_id` unique constraint makes concurrent creation safe:
    /// the insert is `ON CONFLICT DO NOTHING` followed by a re-read.
    pub async fn get_or_create_draft(
        &mut self,
        session_id: &str,
        user_id: &str,
    ) -> Result<JournalDraft, StorageError> {
        assert_user_scope(user_id);
        if let Some(draft) = self.get_draft(session_id, user_id).await? {
            return Ok(draft);
        }

        let draft = JournalDraft::empty(new_id(), session_id.to_owned(), user_id.to_owned());
        sqlx::query(&format!(
            "INSERT INTO journal_drafts ({DRAFT_COLUMNS})
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
             ON CONFLICT (session_id) DO NOTHING"
        ))
        .bind(&draft.id)
        .bind(&draft.session_id)
        .bind(&draft.user_id)
        .bind(serde_json::Value::Object(draft.draft_data.clone()))
        .bind(&draft.raw_text)
        .bind(draft.is_finalized)
        .bind(draft.created_at)
        .bind(draft.updated_at)
        .execute(self.conn())
        .await?;

        self.get_draft(session_id, user_id)
            .await?
            .ok_or_else(|| StorageError::not_found("journal draft", session_id))
    }

    /// Fetch the session's draft without creating one.
    pub async fn get_draft(
        &mut self,
        session_id: &str,
        user_id: &str,
    ) -> Result<Option<JournalDraft>, StorageError> {
        assert_user_scope(user_id);
        let row = sqlx::query(&format!(
            "SELECT {DRAFT_COLUMNS} FROM journal_drafts
             WHERE session_id = $1 AND user_id = $2"
        ))
        .bind(session_id)
        .bind(user_id)
        .fetch_optional(self.conn())
        .await?;
        row.map(|r| row_to_draft(&r)).transpose()
    }

    /// Replace the draft's section data and raw text.
    pub async fn update_draft_data(
        &mut self,
        session_id: &str,
        user_id: &str,
        draft_data: &DraftData,
        raw_text: &str,
    ) -> Result<(), StorageError> {
        assert_user_scope(user_id);
        let result = sqlx::query(
            "UPDATE journal_drafts
             SET draft_data = $1, raw_text = $2, is_finalized = FALSE, updated_at = NOW()
             WHERE session_id = $3 AND user_id = $4",
        )
        .bind(serde_json::Value::Object(draft_data.clone()))
        .bind(raw_text)
        .bind(session_id)
        .bind(user_id)
        .execute(self.conn())
        .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("journal draft", session_id));
        }
        Ok(())
    }

    /// Clear the draft after its content has been copied into an entry.
    /// Runs in the same transaction as the entry insert.
    pub async fn clear_draft(
        &mut self,
        session_id: &str,
        user_id: &str,
    ) -> Result<(), StorageError> {
        assert_user_scope(user_id);
        let result = sqlx::query(
            "UPDATE journal_drafts
             SET draft_data = '{}', raw_text = NULL, is_finalized = TRUE, updated_at = NOW()
             WHERE session_id = $1 AND user_id = $2",
        )
        .bind(session_id)
        .bind(user_id)
        .execute(self.conn())
        .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("journal draft", session_id));
        }
        Ok(())
    }
}
