//! The per-turn agent loop.
//!
//! One call to [`AgentRuntime::chat`] is one turn: load context, persist the
//! user message, let the model interleave tool calls and text until it
//! settles on a reply (or the tool budget runs out), persist the assistant
//! message, and commit. Everything happens under a single transaction
//! serialized by the session's advisory lock; any fatal failure rolls the
//! whole turn back, user message included.

use std::str::FromStr as _;
use std::sync::Arc;

use quill_core::{new_id, ChatMessage, DraftData, MessageRole};
use quill_llm::types::{
    ApiContent, ApiContentBlock, ApiMessage, MessageRequest, ResponseContentBlock, ToolDefinition,
};
use quill_llm::{LlmProvider, Structurer};
use quill_storage::{Store, Tx};
use serde_json::{json, Value};

use crate::catalogue::{catalogue_for, tool_definitions, CatalogueEntry, ToolKind};
use crate::context::AgentContext;
use crate::error::AgentError;
use crate::prompts;
use crate::templates::TemplateProvider;
use crate::tools::{dispatch, ToolEnv, ToolOutcome};

/// Upper bound on model<->tool round trips within one turn.
pub const MAX_TOOL_ROUNDS: usize = 8;
/// Whole-turn retries on transient storage failures.
const MAX_TURN_RETRIES: u32 = 3;
/// Token budget for each model reply.
const REPLY_MAX_TOKENS: u32 = 2048;

/// One executed tool call, recorded in the assistant message metadata and
/// returned to the client.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolCallRecord {
    pub name: String,
    pub input: Value,
    pub output: Value,
    pub is_error: bool,
}

/// The result of one turn.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChatTurn {
    pub text: String,
    pub session_id: String,
    pub updated_draft_data: Option<DraftData>,
    pub tool_calls: Vec<ToolCallRecord>,
    pub metadata: Value,
}

/// Builds per-turn context and drives the model/tool loop.
#[derive(Clone)]
pub struct AgentRuntime {
    store: Store,
    provider: Arc<dyn LlmProvider>,
    structurer: Structurer,
    templates: Arc<TemplateProvider>,
    model: String,
}

impl AgentRuntime {
    pub fn new(
        store: Store,
        provider: Arc<dyn LlmProvider>,
        templates: Arc<TemplateProvider>,
        model: String,
    ) -> Self {
        let structurer = Structurer::new(provider.clone(), model.clone());
        Self { store, provider, structurer, templates, model }
    }

    /// Run one turn, retrying on transient storage failures.
    pub async fn chat(
        &self,
        user_id: &str,
        session_id: &str,
        text: &str,
        metadata: Option<Value>,
    ) -> Result<ChatTurn, AgentError> {
        if text.trim().is_empty() {
            return Err(AgentError::InvalidInput("message text must not be empty".into()));
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.run_turn(user_id, session_id, text, metadata.clone()).await {
                Ok(turn) => return Ok(turn),
                Err(e) if e.is_transient() && attempt < MAX_TURN_RETRIES => {
                    tracing::warn!(attempt, error = %e, "transient turn failure, retrying");
                },
                Err(e) => return Err(e),
            }
        }
    }

    async fn run_turn(
        &self,
        user_id: &str,
        session_id: &str,
        text: &str,
        metadata: Option<Value>,
    ) -> Result<ChatTurn, AgentError> {
        let mut tx = self.store.begin().await?;
        // Serializes concurrent turns on the same session; the second turn
        // sees all effects of the first.
        tx.lock_session(session_id).await?;

        let session = tx
            .get_session_for_user(user_id, session_id)
            .await?
            .ok_or_else(|| AgentError::NotFound(format!("session {session_id}")))?;
        let catalogue = catalogue_for(&session.conversation_type).ok_or_else(|| {
            AgentError::InvalidInput(format!(
                "unknown conversation type: {}",
                session.conversation_type
            ))
        })?;

        let preferences = tx.get_or_create_preferences(user_id).await?;
        let template = self.templates.effective_template(&mut tx, user_id).await?;
        let draft = tx.get_or_create_draft(session_id, user_id).await?;
        let history = tx.get_messages_ordered(session_id).await?;

        let mut ctx = AgentContext {
            user_id: user_id.to_owned(),
            session_id: session_id.to_owned(),
            conversation_type: session.conversation_type.clone(),
            preferences,
            template,
            draft_data: draft.draft_data,
        };

        let user_message = ChatMessage::new(
            new_id(),
            session_id.to_owned(),
            MessageRole::User,
            text.to_owned(),
            metadata.unwrap_or_else(|| json!({})),
        );
        tx.insert_message(&user_message).await?;

        let mut messages = history_to_api(&history);
        messages.push(ApiMessage::user(text));
        let tools = tool_definitions(catalogue);

        let loop_result = self
            .tool_loop(&mut tx, catalogue, &mut ctx, &mut messages, &tools)
            .await?;

        let mut assistant_meta = json!({
            "tool_calls": loop_result.records,
            "usage": {
                "input_tokens": loop_result.input_tokens,
                "output_tokens": loop_result.output_tokens,
            },
        });
        if loop_result.overflow {
            assistant_meta["overflow"] = json!(true);
        }
        let assistant_message = ChatMessage::new(
            new_id(),
            session_id.to_owned(),
            MessageRole::Assistant,
            loop_result.text.clone(),
            assistant_meta.clone(),
        );
        tx.insert_message(&assistant_message).await?;
        tx.touch_session(session_id).await?;

        // Snapshot after all tools; empty after a save.
        let updated_draft_data =
            tx.get_draft(session_id, user_id).await?.map(|d| d.draft_data);

        tx.commit().await?;

        let mut turn_meta = json!({
            "usage": assistant_meta["usage"].clone(),
        });
        if loop_result.overflow {
            turn_meta["overflow"] = json!(true);
        }
        if let Some(entry_id) = saved_entry_id(&loop_result.records) {
            turn_meta["journal_entry_id"] = json!(entry_id);
        }

        Ok(ChatTurn {
            text: loop_result.text,
            session_id: session_id.to_owned(),
            updated_draft_data,
            tool_calls: loop_result.records,
            metadata: turn_meta,
        })
    }

    async fn tool_loop(
        &self,
        tx: &mut Tx,
        catalogue: &CatalogueEntry,
        ctx: &mut AgentContext,
        messages: &mut Vec<ApiMessage>,
        tools: &[ToolDefinition],
    ) -> Result<LoopResult, AgentError> {
        let mut result = LoopResult::default();

        for round in 0..=MAX_TOOL_ROUNDS {
            // The dynamic prompt fragment tracks the draft as tools fill it.
            let request = MessageRequest {
                model: self.model.clone(),
                messages: messages.clone(),
                system: Some(prompts::system_prompt(catalogue.system_prompt, ctx)),
                max_tokens: REPLY_MAX_TOKENS,
                tools: (!tools.is_empty()).then(|| tools.to_vec()),
            };
            // Transport failure propagates and rolls back the whole turn.
            let response = self.provider.complete(request).await?;
            result.input_tokens += u64::from(response.usage.input_tokens);
            result.output_tokens += u64::from(response.usage.output_tokens);

            let tool_uses: Vec<(String, String, Value)> = response
                .tool_uses()
                .map(|(id, name, input)| (id.to_owned(), name.to_owned(), input.clone()))
                .collect();

            if tool_uses.is_empty() {
                result.text = response.text();
                return Ok(result);
            }
            if round == MAX_TOOL_ROUNDS {
                // Budget exhausted: end the turn with whatever text we have.
                tracing::warn!(rounds = MAX_TOOL_ROUNDS, "tool budget exhausted");
                result.overflow = true;
                result.text = response.text();
                if result.text.is_empty() {
                    result.text = "I had to stop mid-way through the tool work for this \
                                   message; everything done so far is kept in your draft."
                        .to_owned();
                }
                return Ok(result);
            }

            messages.push(echo_assistant_blocks(&response.content));

            let mut result_blocks = Vec::with_capacity(tool_uses.len());
            for (tool_use_id, name, input) in tool_uses {
                let outcome = self
                    .run_tool(tx, catalogue, ctx, &name, &input, result.records.len())
                    .await?;
                result_blocks.push(ApiContentBlock::ToolResult {
                    tool_use_id,
                    content: outcome.output.to_string(),
                    is_error: outcome.is_error.then_some(true),
                });
                result.records.push(ToolCallRecord {
                    name,
                    input,
                    output: outcome.output,
                    is_error: outcome.is_error,
                });
            }
            messages.push(ApiMessage {
                role: "user".into(),
                content: ApiContent::Blocks(result_blocks),
            });
        }
        unreachable!("loop always returns within the round budget");
    }

    /// Execute one tool under a savepoint: a failing tool rolls back its own
    /// writes and reports into the loop, it does not abort the turn. LLM
    /// transport failures are the exception and propagate.
    async fn run_tool(
        &self,
        tx: &mut Tx,
        catalogue: &CatalogueEntry,
        ctx: &mut AgentContext,
        name: &str,
        input: &Value,
        index: usize,
    ) -> Result<ToolOutcome, AgentError> {
        let Ok(kind) = ToolKind::from_str(name) else {
            return Ok(ToolOutcome::error(json!({"error": format!("unknown tool: {name}")})));
        };
        if !catalogue.tools.contains(&kind) {
            return Ok(ToolOutcome::error(json!({
                "error": format!("tool {name} is not available in this conversation")
            })));
        }

        let savepoint = format!("tool_{index}");
        tx.savepoint(&savepoint).await?;
        let mut env = ToolEnv {
            tx: &mut *tx,
            structurer: &self.structurer,
            templates: &self.templates,
            ctx: &mut *ctx,
        };
        match dispatch(&mut env, kind, input).await {
            Ok(outcome) => {
                tx.release_savepoint(&savepoint).await?;
                Ok(outcome)
            },
            Err(e @ AgentError::Llm(_)) => Err(e),
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "tool failed, rolling back its writes");
                tx.rollback_to_savepoint(&savepoint).await?;
                tx.release_savepoint(&savepoint).await?;
                Ok(ToolOutcome::error(json!({
                    "error": format!("{name} failed and its changes were discarded")
                })))
            },
        }
    }
}

#[derive(Debug, Default)]
struct LoopResult {
    text: String,
    records: Vec<ToolCallRecord>,
    overflow: bool,
    input_tokens: u64,
    output_tokens: u64,
}

/// Convert stored history into API messages. System rows are internal
/// bookkeeping and stay out of the model conversation.
fn history_to_api(history: &[ChatMessage]) -> Vec<ApiMessage> {
    history
        .iter()
        .filter_map(|msg| match msg.role {
            MessageRole::User => Some(ApiMessage::user(&msg.content)),
            MessageRole::Assistant => Some(ApiMessage::assistant(&msg.content)),
            MessageRole::System => None,
        })
        .collect()
}

/// Echo the model's own content blocks back as the assistant turn so the
/// follow-up tool results have their referents.
fn echo_assistant_blocks(content: &[ResponseContentBlock]) -> ApiMessage {
    let blocks = content
        .iter()
        .map(|block| match block {
            ResponseContentBlock::Text { text } => ApiContentBlock::Text { text: text.clone() },
            ResponseContentBlock::ToolUse { id, name, input } => ApiContentBlock::ToolUse {
                id: id.clone(),
                name: name.clone(),
                input: input.clone(),
            },
        })
        .collect();
    ApiMessage { role: "assistant".into(), content: ApiContent::Blocks(blocks) }
}

/// Entry id from the first successful save in this turn, if any.
fn saved_entry_id(records: &[ToolCallRecord]) -> Option<String> {
    records
        .iter()
        .filter(|r| r.name == ToolKind::SaveJournal.as_str() && !r.is_error)
        .find_map(|r| r.output.get("journal_entry_id").and_then(Value::as_str))
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_maps_roles_and_drops_system() {
        let history = vec![
            ChatMessage::new(new_id(), "s".into(), MessageRole::User, "hi".into(), json!({})),
            ChatMessage::new(new_id(), "s".into(), MessageRole::System, "internal".into(), json!({})),
            ChatMessage::new(new_id(), "s".into(), MessageRole::Assistant, "hello".into(), json!({})),
        ];
        let api = history_to_api(&history);
        assert_eq!(api.len(), 2);
        assert_eq!(api[0].role, "user");
        assert_eq!(api[1].role, "assistant");
    }

    #[test]
    fn saved_entry_id_found_in_records() {
        let records = vec![
            ToolCallRecord {
                name: "structure_journal".into(),
                input: json!({}),
                output: json!({"status": "success"}),
                is_error: false,
            },
            ToolCallRecord {
                name: "save_journal".into(),
                input: json!({"confirm": true}),
                output: json!({"status": "saved", "journal_entry_id": "entry-1"}),
                is_error: false,
            },
        ];
        assert_eq!(saved_entry_id(&records).as_deref(), Some("entry-1"));
        assert_eq!(saved_entry_id(&records[..1]), None);
    }

    #[test]
    fn echoed_blocks_preserve_tool_use() {
        let content = vec![
            ResponseContentBlock::Text { text: "working".into() },
            ResponseContentBlock::ToolUse {
                id: "toolu_1".into(),
                name: "list_tasks".into(),
                input: json!({}),
            },
        ];
        let msg = echo_assistant_blocks(&content);
        assert_eq!(msg.role, "assistant");
        match msg.content {
            ApiContent::Blocks(blocks) => assert_eq!(blocks.len(), 2),
            ApiContent::Text(_) => panic!("expected blocks"),
        }
    }
}
