//! Journal draft and entry types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Section-keyed draft payload. Values are strings, lists of strings, or
/// shallow maps, per the merge rules in the draft engine.
pub type DraftData = serde_json::Map<String, serde_json::Value>;

/// The mutable working payload for one session. Exactly one per session,
/// created lazily on first write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalDraft {
    /// Unique draft identifier
    pub id: String,
    /// Session this draft belongs to (unique)
    pub session_id: String,
    /// Owning user
    pub user_id: String,
    /// Section name -> accumulated content
    pub draft_data: DraftData,
    /// Concatenated user utterances captured alongside the structured data
    pub raw_text: Option<String>,
    /// Set when the draft has been turned into an entry
    pub is_finalized: bool,
    /// Row creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl JournalDraft {
    /// Creates an empty draft for a session.
    #[must_use]
    pub fn empty(id: String, session_id: String, user_id: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            session_id,
            user_id,
            draft_data: DraftData::new(),
            raw_text: None,
            is_finalized: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether any section holds non-empty content.
    #[must_use]
    pub fn has_content(&self) -> bool {
        self.draft_data.values().any(|v| match v {
            serde_json::Value::String(s) => !s.trim().is_empty(),
            serde_json::Value::Array(items) => !items.is_empty(),
            serde_json::Value::Object(map) => !map.is_empty(),
            serde_json::Value::Null => false,
            _ => true,
        })
    }
}

/// A finalized, immutable journal record derived from a draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Unique entry identifier
    pub id: String,
    /// Owning user
    pub user_id: String,
    /// Session the entry came from, if any
    pub session_id: Option<String>,
    /// Generated title
    pub title: String,
    /// Verbatim copy of the draft's section data at finalize time
    pub structured_data: DraftData,
    /// Raw utterances captured while drafting
    pub raw_text: String,
    /// Free-form metadata
    pub metadata: serde_json::Value,
    /// Creation time
    pub created_at: DateTime<Utc>,
}
