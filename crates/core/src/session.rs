//! Chat session and message types.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Conversation type used when none is requested.
pub const DEFAULT_CONVERSATION_TYPE: &str = "journaling";

/// One conversation thread between a user and the assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    /// Unique session identifier
    pub id: String,
    /// Owning user
    pub user_id: String,
    /// Selects the tool catalogue and system prompt
    pub conversation_type: String,
    /// Cleared when the session is archived
    pub is_active: bool,
    /// Free-form client metadata
    pub metadata: serde_json::Value,
    /// Row creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    /// Creates a new active session.
    #[must_use]
    pub fn new(
        id: String,
        user_id: String,
        conversation_type: String,
        metadata: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            conversation_type,
            is_active: true,
            metadata,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// End-user utterance
    User,
    /// Assistant reply
    Assistant,
    /// Injected system content
    System,
}

impl MessageRole {
    /// Returns the string representation of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match *self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl FromStr for MessageRole {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "system" => Ok(Self::System),
            _ => Err(CoreError::InvalidRole(s.to_owned())),
        }
    }
}

/// One message in a session. Append-only, ordered by creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique message identifier
    pub id: String,
    /// Session this message belongs to
    pub session_id: String,
    /// Message author
    pub role: MessageRole,
    /// Message text
    pub content: String,
    /// Tool call record, client hints, and similar
    pub metadata: serde_json::Value,
    /// Creation time, the ordering key
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Creates a new message stamped now.
    #[must_use]
    pub fn new(
        id: String,
        session_id: String,
        role: MessageRole,
        content: String,
        metadata: serde_json::Value,
    ) -> Self {
        Self { id, session_id, role, content, metadata, created_at: Utc::now() }
    }
}
