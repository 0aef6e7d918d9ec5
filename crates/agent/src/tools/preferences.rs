//! Preference and template tools.

use quill_core::PreferencesUpdate;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AgentError;
use crate::tools::{parse_args, ToolEnv, ToolOutcome};

#[derive(Debug, Deserialize)]
struct UpdateArgs {
    updates: PreferencesUpdate,
}

/// Shallow-merge an update into the user's preferences.
pub async fn update_preferences(
    env: &mut ToolEnv<'_>,
    args: &Value,
) -> Result<ToolOutcome, AgentError> {
    let args: UpdateArgs = match parse_args(args) {
        Ok(a) => a,
        Err(outcome) => return Ok(outcome),
    };

    let mut updated_fields = Vec::new();
    if args.updates.purpose_statement.is_some() {
        updated_fields.push("purpose_statement");
    }
    if args.updates.long_term_goals.is_some() {
        updated_fields.push("long_term_goals");
    }
    if args.updates.known_challenges.is_some() {
        updated_fields.push("known_challenges");
    }
    if args.updates.preferred_feedback_style.is_some() {
        updated_fields.push("preferred_feedback_style");
    }
    if args.updates.personal_glossary.is_some() {
        updated_fields.push("personal_glossary");
    }
    if updated_fields.is_empty() {
        return Ok(ToolOutcome::ok(json!({
            "status": "no_change",
            "updated_fields": []
        })));
    }

    let mut prefs = env.ctx.preferences.clone();
    args.updates.apply_to(&mut prefs);
    env.tx.upsert_preferences(&prefs).await?;
    env.ctx.preferences = prefs;

    Ok(ToolOutcome::ok(json!({
        "status": "success",
        "updated_fields": updated_fields
    })))
}

/// Return the active template's section catalogue.
pub fn get_template_info(env: &mut ToolEnv<'_>) -> Result<ToolOutcome, AgentError> {
    let template = serde_json::to_value(&env.ctx.template)
        .unwrap_or_else(|_| json!({"name": env.ctx.template.name}));
    Ok(ToolOutcome::ok(json!({ "template": template })))
}

/// Reload the process default template, then re-resolve the effective one
/// for this user so the rest of the turn sees the fresh catalogue.
pub async fn reload_template(env: &mut ToolEnv<'_>) -> Result<ToolOutcome, AgentError> {
    env.templates.reload();
    let user_id = env.ctx.user_id.clone();
    env.ctx.template = env.templates.effective_template(env.tx, &user_id).await?;
    Ok(ToolOutcome::ok(json!({
        "status": "reloaded",
        "template": env.ctx.template.name,
        "sections": env.ctx.template.section_names().collect::<Vec<_>>()
    })))
}
