//! Typed error enum for the agent layer.
//!
//! Unifies storage and LLM failures behind one type the HTTP edge can map
//! onto status codes. Structuring failures never appear here; they are
//! handled inside the tool loop and surface as clarifying replies.

use quill_llm::LlmError;
use quill_storage::StorageError;
use thiserror::Error;

/// Agent-layer error.
#[derive(Debug, Error)]
pub enum AgentError {
    /// User-scoped lookup produced no row.
    #[error("not found: {0}")]
    NotFound(String),

    /// Caller provided invalid input (unknown conversation type, empty text).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Precondition violation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Storage failure. Rolls back the turn.
    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    /// LLM transport failure or timeout. Rolls back the turn; maps to 503.
    #[error("llm: {0}")]
    Llm(#[from] LlmError),
}

impl AgentError {
    /// Whether retrying the whole turn may succeed (DB serialization
    /// failures and the like).
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Storage(e) if e.is_transient())
    }
}
