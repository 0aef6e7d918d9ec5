//! Provider abstraction over the LLM transport.
//!
//! The runtime and structurer take `Arc<dyn LlmProvider>` so tests can swap
//! in a deterministic mock for the real HTTP client.

use async_trait::async_trait;

use crate::error::LlmError;
use crate::types::{MessageRequest, MessageResponse};

/// One-shot completion over the Messages API shape.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a request and return the full response.
    async fn complete(&self, request: MessageRequest) -> Result<MessageResponse, LlmError>;
}
