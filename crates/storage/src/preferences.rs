//! User preference rows. Exactly one per user, created lazily on first read.

use std::str::FromStr as _;

use quill_core::{FeedbackStyle, UserPreferences};
use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::error::StorageError;
use crate::store::{assert_user_scope, Tx};
use crate::decode_json;

const PREF_COLUMNS: &str = "user_id, purpose_statement, long_term_goals, known_challenges,
     preferred_feedback_style, personal_glossary, created_at, updated_at";

fn row_to_preferences(row: &PgRow) -> Result<UserPreferences, StorageError> {
    let style_str: String = row.try_get("preferred_feedback_style")?;
    let preferred_feedback_style = FeedbackStyle::from_str(&style_str).unwrap_or_else(|_| {
        tracing::warn!(invalid_style = %style_str, "corrupt feedback style in DB, defaulting");
        FeedbackStyle::default()
    });
    Ok(UserPreferences {
        user_id: row.try_get("user_id")?,
        purpose_statement: row.try_get("purpose_statement")?,
        long_term_goals: decode_json("long_term_goals", row.try_get("long_term_goals")?)?,
        known_challenges: decode_json("known_challenges", row.try_get("known_challenges")?)?,
        preferred_feedback_style,
        personal_glossary: decode_json("personal_glossary", row.try_get("personal_glossary")?)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl Tx {
    /// Fetch preferences, inserting the documented defaults if absent.
    pub async fn get_or_create_preferences(
        &mut self,
        user_id: &str,
    ) -> Result<UserPreferences, StorageError> {
        assert_user_scope(user_id);
        let row = sqlx::query(&format!(
            "SELECT {PREF_COLUMNS} FROM user_preferences WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(self.conn())
        .await?;
        if let Some(row) = row {
            return row_to_preferences(&row);
        }

        let defaults = UserPreferences::default_for(user_id.to_owned());
        self.upsert_preferences(&defaults).await?;
        Ok(defaults)
    }

    /// Insert or replace the full preference row.
    pub async fn upsert_preferences(
        &mut self,
        prefs: &UserPreferences,
    ) -> Result<(), StorageError> {
        assert_user_scope(&prefs.user_id);
        sqlx::query(&format!(
            "INSERT INTO user_preferences ({PREF_COLUMNS})
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
             ON CONFLICT (user_id) DO UPDATE SET
               purpose_statement = EXCLUDED.purpose_statement,
               long_term_goals = EXCLUDED.long_term_goals,
               known_challenges = EXCLUDED.known_challenges,
               preferred_feedback_style = EXCLUDED.preferred_feedback_style,
               personal_glossary = EXCLUDED.personal_glossary,
               updated_at = EXCLUDED.updated_at"
        ))
        .bind(&prefs.user_id)
        .bind(&prefs.purpose_statement)
        .bind(serde_json::to_value(&prefs.long_term_goals)?)
        .bind(serde_json::to_value(&prefs.known_challenges)?)
        .bind(prefs.preferred_feedback_style.as_str())
        .bind(serde_json::to_value(&prefs.personal_glossary)?)
        .bind(prefs.created_at)
        .bind(prefs.updated_at)
        .execute(self.conn())
        .await?;
        Ok(())
    }
}
