//! Draft lifecycle: merge patches in, finalize into entries.

use chrono::Utc;
use quill_core::{new_id, DraftData, JournalDraft, JournalEntry, JournalTemplate};
use quill_storage::Tx;
use serde_json::Value;

use crate::error::AgentError;

const TITLE_MAX_LEN: usize = 50;

/// What one merge did: which sections changed and which were not in the
/// active template (accepted anyway; the template may have changed
/// mid-session).
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct MergeReport {
    pub sections_updated: Vec<String>,
    pub unknown_sections: Vec<String>,
}

/// Draft operations. Stateless; everything runs in the caller's transaction.
pub struct DraftEngine;

impl DraftEngine {
    /// The session's draft, created empty when absent. Idempotent.
    pub async fn load(
        tx: &mut Tx,
        session_id: &str,
        user_id: &str,
    ) -> Result<JournalDraft, AgentError> {
        Ok(tx.get_or_create_draft(session_id, user_id).await?)
    }

    /// Merge a section-keyed patch into `draft_data` in place.
    ///
    /// Rules per section: string onto string concatenates with a newline;
    /// list onto list (or absent) appends without dedup; map onto map
    /// shallow-merges; any other pairing coerces both sides into one list.
    pub fn merge_patch(
        draft_data: &mut DraftData,
        patch: &DraftData,
        template: &JournalTemplate,
    ) -> MergeReport {
        let mut report = MergeReport::default();
        for (section, incoming) in patch {
            if !template.contains(section) {
                tracing::warn!(section = %section, "merging into section unknown to the template");
                report.unknown_sections.push(section.clone());
            }
            let merged = match draft_data.remove(section) {
                None => incoming.clone(),
                Some(existing) => merge_value(existing, incoming.clone()),
            };
            draft_data.insert(section.clone(), merged);
            report.sections_updated.push(section.clone());
        }
        report
    }

    /// Finalize the session's draft into a new immutable entry.
    ///
    /// Atomic within the caller's transaction: the entry insert and the
    /// draft clear either both commit or neither does. The draft must hold
    /// content; callers gate on that and report a rejection otherwise.
    pub async fn finalize(
        tx: &mut Tx,
        session_id: &str,
        user_id: &str,
    ) -> Result<JournalEntry, AgentError> {
        let draft = tx
            .get_draft(session_id, user_id)
            .await?
            .ok_or_else(|| AgentError::NotFound(format!("draft for session {session_id}")))?;
        if !draft.has_content() {
            return Err(AgentError::Conflict("draft is empty".into()));
        }

        let raw_text = match draft.raw_text {
            Some(text) if !text.is_empty() => text,
            _ => tx.get_session_raw_text(session_id).await?,
        };

        let entry = JournalEntry {
            id: new_id(),
            user_id: user_id.to_owned(),
            session_id: Some(session_id.to_owned()),
            title: generate_title(&draft.draft_data),
            structured_data: draft.draft_data,
            raw_text,
            metadata: serde_json::json!({}),
            created_at: Utc::now(),
        };
        tx.insert_entry(&entry).await?;
        tx.clear_draft(session_id, user_id).await?;
        tracing::info!(entry_id = %entry.id, session_id, "draft finalized");
        Ok(entry)
    }
}

fn merge_value(existing: Value, incoming: Value) -> Value {
    match (existing, incoming) {
        (Value::String(a), Value::String(b)) => Value::String(format!("{a}\n{b}")),
        (Value::Array(mut a), Value::Array(b)) => {
            a.extend(b);
            Value::Array(a)
        },
        (Value::Object(mut a), Value::Object(b)) => {
            for (k, v) in b {
                a.insert(k, v);
            }
            Value::Object(a)
        },
        // Type conflict: coerce both sides into one list.
        (a, b) => {
            let mut items = Vec::new();
            for value in [a, b] {
                match value {
                    Value::Array(inner) => items.extend(inner),
                    other => items.push(other),
                }
            }
            Value::Array(items)
        },
    }
}

/// First 50 characters of the first non-empty section value, whitespace
/// collapsed; a dated placeholder when the draft carries nothing usable.
#[must_use]
pub fn generate_title(draft_data: &DraftData) -> String {
    for value in draft_data.values() {
        let candidate = match value {
            Value::String(s) => Some(s.clone()),
            Value::Array(items) => items.first().map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
            _ => None,
        };
        if let Some(text) = candidate {
            let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if collapsed.is_empty() {
                continue;
            }
            let truncated: String = collapsed.chars().take(TITLE_MAX_LEN).collect();
            return if collapsed.chars().count() > TITLE_MAX_LEN {
                format!("{truncated}...")
            } else {
                truncated
            };
        }
    }
    format!("Journal Entry — {}", Utc::now().format("%Y-%m-%d"))
}
