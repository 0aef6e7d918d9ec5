//! Journal tools: structure text into the draft, finalize the draft.

use quill_llm::StructureError;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::draft::DraftEngine;
use crate::error::AgentError;
use crate::tools::{parse_args, ToolEnv, ToolOutcome};

#[derive(Debug, Deserialize)]
struct StructureArgs {
    text: String,
}

/// Classify the given text into template sections and merge the result into
/// the session draft.
pub async fn structure_journal(
    env: &mut ToolEnv<'_>,
    args: &Value,
) -> Result<ToolOutcome, AgentError> {
    let args: StructureArgs = match parse_args(args) {
        Ok(a) => a,
        Err(outcome) => return Ok(outcome),
    };
    let text = args.text.trim();
    if text.is_empty() {
        return Ok(ToolOutcome::ok(json!({
            "status": "no_content",
            "sections_updated": []
        })));
    }

    let patch = match env.structurer.structure(text, &env.ctx.template).await {
        Ok(patch) => patch,
        // Transport failure aborts the turn; nothing may be persisted.
        Err(StructureError::Upstream(e)) => return Err(AgentError::Llm(e)),
        Err(StructureError::Malformed(detail)) => {
            tracing::warn!(detail, "structuring produced unusable output");
            return Ok(ToolOutcome::error(json!({
                "status": "structuring_failed",
                "error": "could not derive journal sections from the text; \
                          ask the user to rephrase or elaborate"
            })));
        },
    };
    if patch.is_empty() {
        return Ok(ToolOutcome::ok(json!({
            "status": "no_content",
            "sections_updated": []
        })));
    }

    let session_id = env.ctx.session_id.clone();
    let user_id = env.ctx.user_id.clone();
    let mut draft = DraftEngine::load(env.tx, &session_id, &user_id).await?;
    let report = DraftEngine::merge_patch(&mut draft.draft_data, &patch.sections, &env.ctx.template);
    let raw_text = env.tx.get_session_raw_text(&session_id).await?;
    env.tx.update_draft_data(&session_id, &user_id, &draft.draft_data, &raw_text).await?;
    env.ctx.draft_data = draft.draft_data;

    let mut output = json!({
        "status": "success",
        "sections_updated": report.sections_updated,
    });
    if !report.unknown_sections.is_empty() {
        output["unknown_sections"] = json!(report.unknown_sections);
    }
    Ok(ToolOutcome::ok(output))
}

#[derive(Debug, Deserialize)]
struct SaveArgs {
    #[serde(default)]
    confirm: bool,
}

/// Finalize the draft into a journal entry, when confirmed and non-empty.
pub async fn save_journal(env: &mut ToolEnv<'_>, args: &Value) -> Result<ToolOutcome, AgentError> {
    let args: SaveArgs = match parse_args(args) {
        Ok(a) => a,
        Err(outcome) => return Ok(outcome),
    };
    if !args.confirm {
        return Ok(ToolOutcome::ok(json!({
            "status": "rejected",
            "reason": "confirmation required; ask the user whether to save"
        })));
    }

    let session_id = env.ctx.session_id.clone();
    let user_id = env.ctx.user_id.clone();
    match DraftEngine::finalize(env.tx, &session_id, &user_id).await {
        Ok(entry) => {
            env.ctx.draft_data.clear();
            Ok(ToolOutcome::ok(json!({
                "status": "saved",
                "journal_entry_id": entry.id,
                "title": entry.title
            })))
        },
        Err(AgentError::Conflict(_) | AgentError::NotFound(_)) => Ok(ToolOutcome::ok(json!({
            "status": "rejected",
            "reason": "there is nothing in the draft to save yet"
        }))),
        Err(e) => Err(e),
    }
}
