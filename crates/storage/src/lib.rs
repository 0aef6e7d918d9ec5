//! PostgreSQL persistence for quill.
//!
//! [`Store`] owns the pool; every request opens one [`Tx`] and all entity
//! CRUD is implemented on it, split across modules by entity. Every
//! user-owned accessor requires the owning `user_id`.

mod auth_sessions;
mod drafts;
mod entries;
mod error;
mod messages;
mod migrations;
mod preferences;
mod sessions;
mod store;
mod tasks;
mod templates;
mod users;

pub use error::StorageError;
pub use migrations::run_migrations;
pub use store::{Store, Tx};

use quill_core::DraftData;

/// Decode a JSONB column into a typed value.
pub(crate) fn decode_json<T: serde::de::DeserializeOwned>(
    context: &str,
    value: serde_json::Value,
) -> Result<T, StorageError> {
    serde_json::from_value(value).map_err(|e| StorageError::DataCorruption {
        context: context.to_owned(),
        source: Box::new(e),
    })
}

/// Decode a JSONB object column into section-keyed draft data.
pub(crate) fn decode_draft_data(
    context: &str,
    value: serde_json::Value,
) -> Result<DraftData, StorageError> {
    match value {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(StorageError::DataCorruption {
            context: format!("{context}: expected object, got {other}"),
            source: Box::new(std::io::Error::other("non-object draft payload")),
        }),
    }
}
