//! Tool handlers and dispatch.
//!
//! Every handler runs inside the turn's transaction; the runtime wraps each
//! call in a savepoint so a failed tool discards only its own writes. A
//! handler returns `Ok(ToolOutcome)` for anything the model should hear
//! about (including its own mistakes) and `Err` only for failures that must
//! abort the whole turn.

mod journal;
mod preferences;
mod tasks;

use quill_llm::Structurer;
use quill_storage::Tx;
use serde_json::Value;

use crate::catalogue::ToolKind;
use crate::context::AgentContext;
use crate::error::AgentError;
use crate::templates::TemplateProvider;

/// What a tool produced: a JSON payload fed back to the model, and whether
/// it represents a failure.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub output: Value,
    pub is_error: bool,
}

impl ToolOutcome {
    pub(crate) fn ok(output: Value) -> Self {
        Self { output, is_error: false }
    }

    pub(crate) fn error(output: Value) -> Self {
        Self { output, is_error: true }
    }
}

/// Shared state handed to each tool handler.
pub struct ToolEnv<'a> {
    pub tx: &'a mut Tx,
    pub structurer: &'a Structurer,
    pub templates: &'a TemplateProvider,
    pub ctx: &'a mut AgentContext,
}

/// Route one tool call to its handler.
pub async fn dispatch(
    env: &mut ToolEnv<'_>,
    kind: ToolKind,
    args: &Value,
) -> Result<ToolOutcome, AgentError> {
    match kind {
        ToolKind::StructureJournal => journal::structure_journal(env, args).await,
        ToolKind::SaveJournal => journal::save_journal(env, args).await,
        ToolKind::UpdatePreferences => preferences::update_preferences(env, args).await,
        ToolKind::GetTemplateInfo => preferences::get_template_info(env),
        ToolKind::ReloadTemplate => preferences::reload_template(env).await,
        ToolKind::CreateTask => tasks::create_task(env, args).await,
        ToolKind::ListTasks => tasks::list_tasks(env, args).await,
        ToolKind::CompleteTask => tasks::complete_task(env, args).await,
        ToolKind::DeleteTask => tasks::delete_task(env, args).await,
    }
}

/// Deserialize tool arguments, turning a mismatch into a tool-visible error
/// instead of aborting the turn. The model gets a chance to correct itself.
pub(crate) fn parse_args<T: serde::de::DeserializeOwned>(args: &Value) -> Result<T, ToolOutcome> {
    serde_json::from_value(args.clone()).map_err(|e| {
        ToolOutcome::error(serde_json::json!({
            "error": format!("invalid arguments: {e}")
        }))
    })
}
