//! Messages API request/response types (non-streaming).

use serde::{Deserialize, Serialize};

/// A tool definition offered to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (unique identifier).
    pub name: String,
    /// What the tool does, phrased for the model.
    pub description: String,
    /// JSON Schema for the tool's input.
    pub input_schema: serde_json::Value,
}

/// A request to the Messages API.
#[derive(Debug, Clone, Serialize)]
pub struct MessageRequest {
    /// Model identifier.
    pub model: String,
    /// Conversation messages, oldest first.
    pub messages: Vec<ApiMessage>,
    /// System prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Tool definitions available to the model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
}

/// A single message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiMessage {
    /// "user" or "assistant".
    pub role: String,
    /// Plain text or structured blocks.
    pub content: ApiContent,
}

impl ApiMessage {
    /// A plain-text user message.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: "user".into(), content: ApiContent::Text(text.into()) }
    }

    /// A plain-text assistant message.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: "assistant".into(), content: ApiContent::Text(text.into()) }
    }
}

/// Message content, either a plain string or typed blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApiContent {
    /// Simple text content.
    Text(String),
    /// Array of typed content blocks.
    Blocks(Vec<ApiContentBlock>),
}

/// A typed content block within a request message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ApiContentBlock {
    /// Text block.
    #[serde(rename = "text")]
    Text { text: String },
    /// Tool invocation echoed back in the assistant turn.
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    /// Tool outcome supplied in the following user turn.
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

/// A full Messages API response.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    /// Response id.
    pub id: String,
    /// Content blocks.
    pub content: Vec<ResponseContentBlock>,
    /// Model that generated the response.
    pub model: String,
    /// Why generation stopped ("end_turn", "tool_use", ...).
    pub stop_reason: Option<String>,
    /// Token usage.
    #[serde(default)]
    pub usage: ApiUsage,
}

impl MessageResponse {
    /// All text blocks joined in order.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        for block in &self.content {
            if let ResponseContentBlock::Text { text } = block {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(text);
            }
        }
        out
    }

    /// Tool invocations requested by the model, in order.
    pub fn tool_uses(&self) -> impl Iterator<Item = (&str, &str, &serde_json::Value)> {
        self.content.iter().filter_map(|block| match block {
            ResponseContentBlock::ToolUse { id, name, input } => {
                Some((id.as_str(), name.as_str(), input))
            },
            ResponseContentBlock::Text { .. } => None,
        })
    }
}

/// A content block in a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ResponseContentBlock {
    /// Text block.
    #[serde(rename = "text")]
    Text { text: String },
    /// The model requests a tool invocation.
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct ApiUsage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

/// Error body returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

/// Error detail within an API error response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(rename = "type")]
    pub type_: String,
    pub message: String,
}
