//! User template rows. At most one active template per user, enforced by a
//! partial unique index.

use quill_core::{JournalTemplate, SectionDefinition, UserTemplate};
use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::decode_json;
use crate::error::StorageError;
use crate::store::{assert_user_scope, Tx};

const TEMPLATE_COLUMNS: &str = "id, user_id, name, sections, is_active, created_at, updated_at";

fn row_to_template(row: &PgRow) -> Result<UserTemplate, StorageError> {
    let sections: Vec<SectionDefinition> = decode_json("sections", row.try_get("sections")?)?;
    Ok(UserTemplate {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        template: JournalTemplate { name: row.try_get("name")?, sections },
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl Tx {
    /// The user's active template, if they have one.
    pub async fn get_active_template(
        &mut self,
        user_id: &str,
    ) -> Result<Option<UserTemplate>, StorageError> {
        assert_user_scope(user_id);
        let row = sqlx::query(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM user_templates
             WHERE user_id = $1 AND is_active"
        ))
        .bind(user_id)
        .fetch_optional(self.conn())
        .await?;
        row.map(|r| row_to_template(&r)).transpose()
    }

    /// Insert or replace the user's active template. Any previously active
    /// template is deactivated first so the partial unique index holds.
    pub async fn upsert_active_template(
        &mut self,
        template: &UserTemplate,
    ) -> Result<(), StorageError> {
        assert_user_scope(&template.user_id);
        sqlx::query(
            "UPDATE user_templates SET is_active = FALSE, updated_at = NOW()
             WHERE user_id = $1 AND is_active AND id <> $2",
        )
        .bind(&template.user_id)
        .bind(&template.id)
        .execute(self.conn())
        .await?;

        sqlx::query(&format!(
            "INSERT INTO user_templates ({TEMPLATE_COLUMNS})
             VALUES ($1,$2,$3,$4,$5,$6,$7)
             ON CONFLICT (id) DO UPDATE SET
               name = EXCLUDED.name,
               sections = EXCLUDED.sections,
               is_active = EXCLUDED.is_active,
               updated_at = EXCLUDED.updated_at"
        ))
        .bind(&template.id)
        .bind(&template.user_id)
        .bind(&template.template.name)
        .bind(serde_json::to_value(&template.template.sections)?)
        .bind(template.is_active)
        .bind(template.created_at)
        .bind(template.updated_at)
        .execute(self.conn())
        .await?;
        Ok(())
    }
}
