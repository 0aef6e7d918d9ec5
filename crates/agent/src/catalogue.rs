//! The fixed tool catalogue, keyed by conversation type.
//!
//! New conversation types are added by inserting into the registry below;
//! there is no subclassing anywhere.

use std::str::FromStr;

use quill_llm::types::ToolDefinition;
use serde_json::json;

/// Every tool the journaling agent can call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    StructureJournal,
    SaveJournal,
    UpdatePreferences,
    GetTemplateInfo,
    ReloadTemplate,
    CreateTask,
    ListTasks,
    CompleteTask,
    DeleteTask,
}

impl ToolKind {
    /// Wire name of the tool.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match *self {
            Self::StructureJournal => "structure_journal",
            Self::SaveJournal => "save_journal",
            Self::UpdatePreferences => "update_preferences",
            Self::GetTemplateInfo => "get_template_info",
            Self::ReloadTemplate => "reload_template",
            Self::CreateTask => "create_task",
            Self::ListTasks => "list_tasks",
            Self::CompleteTask => "complete_task",
            Self::DeleteTask => "delete_task",
        }
    }

    /// Name, description, and argument schema offered to the model.
    #[must_use]
    pub fn definition(&self) -> ToolDefinition {
        match *self {
            Self::StructureJournal => ToolDefinition {
                name: self.as_str().into(),
                description: "Route the user's journaling text into the sections of their \
                              journal template. Call this whenever the user shares thoughts, \
                              feelings, activities, trades, or anything else worth journaling."
                    .into(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "text": {"type": "string", "description": "The user's text to structure"}
                    },
                    "required": ["text"]
                }),
            },
            Self::SaveJournal => ToolDefinition {
                name: self.as_str().into(),
                description: "Finalize the working draft into a permanent journal entry. Only \
                              call this after the user explicitly asks to save, and pass \
                              confirm=true."
                    .into(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "confirm": {"type": "boolean", "description": "Must be true; set only on an explicit user request to save"}
                    },
                    "required": ["confirm"]
                }),
            },
            Self::UpdatePreferences => ToolDefinition {
                name: self.as_str().into(),
                description: "Update the user's stored preferences from conversation insights. \
                              List fields replace wholesale; the personal glossary merges."
                    .into(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "updates": {
                            "type": "object",
                            "properties": {
                                "purpose_statement": {"type": "string"},
                                "long_term_goals": {"type": "array", "items": {"type": "string"}},
                                "known_challenges": {"type": "array", "items": {"type": "string"}},
                                "preferred_feedback_style": {
                                    "type": "string",
                                    "enum": ["supportive", "direct", "socratic"]
                                },
                                "personal_glossary": {
                                    "type": "object",
                                    "additionalProperties": {"type": "string"}
                                }
                            }
                        }
                    },
                    "required": ["updates"]
                }),
            },
            Self::GetTemplateInfo => ToolDefinition {
                name: self.as_str().into(),
                description: "Return the active journal template's section catalogue.".into(),
                input_schema: json!({"type": "object", "properties": {}}),
            },
            Self::ReloadTemplate => ToolDefinition {
                name: self.as_str().into(),
                description: "Reload the default journal template from its source of truth."
                    .into(),
                input_schema: json!({"type": "object", "properties": {}}),
            },
            Self::CreateTask => ToolDefinition {
                name: self.as_str().into(),
                description: "Create a task on the user's task list. Without a priority the \
                              task lands at the end of the list."
                    .into(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "title": {"type": "string"},
                        "description": {"type": "string"},
                        "priority": {"type": "integer", "minimum": 1},
                        "due_date": {"type": "string", "description": "ISO date (YYYY-MM-DD)"}
                    },
                    "required": ["title"]
                }),
            },
            Self::ListTasks => ToolDefinition {
                name: self.as_str().into(),
                description: "List the user's tasks in priority order.".into(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "include_completed": {"type": "boolean", "default": false}
                    }
                }),
            },
            Self::CompleteTask => ToolDefinition {
                name: self.as_str().into(),
                description: "Mark a task as completed.".into(),
                input_schema: json!({
                    "type": "object",
                    "properties": {"task_id": {"type": "string"}},
                    "required": ["task_id"]
                }),
            },
            Self::DeleteTask => ToolDefinition {
                name: self.as_str().into(),
                description: "Delete a task from the user's list.".into(),
                input_schema: json!({
                    "type": "object",
                    "properties": {"task_id": {"type": "string"}},
                    "required": ["task_id"]
                }),
            },
        }
    }
}

impl FromStr for ToolKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "structure_journal" => Ok(Self::StructureJournal),
            "save_journal" => Ok(Self::SaveJournal),
            "update_preferences" => Ok(Self::UpdatePreferences),
            "get_template_info" => Ok(Self::GetTemplateInfo),
            "reload_template" => Ok(Self::ReloadTemplate),
            "create_task" => Ok(Self::CreateTask),
            "list_tasks" => Ok(Self::ListTasks),
            "complete_task" => Ok(Self::CompleteTask),
            "delete_task" => Ok(Self::DeleteTask),
            _ => Err(()),
        }
    }
}

/// One registry row: the base system prompt fragment and the tool set.
pub struct CatalogueEntry {
    pub system_prompt: &'static str,
    pub tools: &'static [ToolKind],
}

static JOURNALING_TOOLS: &[ToolKind] = &[
    ToolKind::StructureJournal,
    ToolKind::SaveJournal,
    ToolKind::UpdatePreferences,
    ToolKind::GetTemplateInfo,
    ToolKind::ReloadTemplate,
    ToolKind::CreateTask,
    ToolKind::ListTasks,
    ToolKind::CompleteTask,
    ToolKind::DeleteTask,
];

static JOURNALING: CatalogueEntry = CatalogueEntry {
    system_prompt: crate::prompts::JOURNALING_BASE_PROMPT,
    tools: JOURNALING_TOOLS,
};

static GENERAL: CatalogueEntry = CatalogueEntry {
    system_prompt: crate::prompts::GENERAL_BASE_PROMPT,
    tools: &[],
};

/// Look up the catalogue for a conversation type.
#[must_use]
pub fn catalogue_for(conversation_type: &str) -> Option<&'static CatalogueEntry> {
    match conversation_type {
        "journaling" => Some(&JOURNALING),
        "general" => Some(&GENERAL),
        _ => None,
    }
}

/// Tool definitions for a conversation type, in catalogue order.
#[must_use]
pub fn tool_definitions(entry: &CatalogueEntry) -> Vec<ToolDefinition> {
    entry.tools.iter().map(ToolKind::definition).collect()
}
