//! Typed error enum for the storage layer.
//!
//! Callers match on specific failure modes (not found, duplicate, transient)
//! instead of downcasting opaque boxes; the HTTP edge maps these onto status
//! codes.

use thiserror::Error;

/// Storage-layer error with variants covering every expected failure mode.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Row not found for an expected-present, user-scoped entity.
    #[error("not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    /// Unique constraint violation (username, email, active template).
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// Precondition violation (reorder not a permutation, already completed).
    #[error("conflict: {0}")]
    Conflict(String),

    /// SQL / connection / timeout failure.
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    /// Row data could not be deserialized into a domain type.
    #[error("data corruption: {context}")]
    DataCorruption {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Migration failure.
    #[error("migration error: {0}")]
    Migration(String),
}

impl StorageError {
    /// Whether this error is likely transient (worth retrying).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Database(e) => {
                matches!(e, sqlx::Error::PoolTimedOut | sqlx::Error::Io(_))
                    || matches!(e, sqlx::Error::Database(db) if db.code().is_some_and(|c| c == "40001"))
            },
            _ => false,
        }
    }

    /// Whether this error is a unique-constraint violation.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }

    /// Shorthand for a not-found error.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { entity, id: id.into() }
    }
}

/// Hand-written `From<sqlx::Error>` rather than a blanket `#[from]`:
/// `RowNotFound` becomes `NotFound` (callers remap with entity context),
/// SQLSTATE 23505 becomes `Duplicate`, everything else stays `Database`.
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound { entity: "row", id: "unknown".into() },
            sqlx::Error::Database(db_err) if db_err.code().is_some_and(|c| c == "23505") => {
                Self::Duplicate(db_err.message().to_owned())
            },
            _ => Self::Database(err),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::DataCorruption {
            context: "JSON column serialization".to_owned(),
            source: Box::new(err),
        }
    }
}
