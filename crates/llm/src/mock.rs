//! Deterministic mock provider for tests.
//!
//! Replies pop from a FIFO queue; an empty queue yields a fixed default
//! text. Every received request is recorded for assertions.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::LlmError;
use crate::provider::LlmProvider;
use crate::types::{ApiUsage, MessageRequest, MessageResponse, ResponseContentBlock};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Plain assistant text, stop_reason "end_turn".
    Text(String),
    /// A tool invocation, stop_reason "tool_use".
    ToolUse { name: String, input: serde_json::Value },
    /// A transient transport failure.
    TransportFailure,
}

/// A scripted LLM provider.
pub struct MockProvider {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    requests: Arc<Mutex<Vec<MessageRequest>>>,
    always_fail: std::sync::atomic::AtomicBool,
}

impl MockProvider {
    /// An empty-queue provider; every call returns the default text.
    #[must_use]
    pub fn new() -> Self {
        Self::with_replies(Vec::new())
    }

    /// A provider pre-loaded with replies.
    #[must_use]
    pub fn with_replies(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            requests: Arc::new(Mutex::new(Vec::new())),
            always_fail: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// A provider that fails every call with a transport error.
    #[must_use]
    pub fn failing() -> Self {
        let provider = Self::new();
        provider.always_fail.store(true, std::sync::atomic::Ordering::Relaxed);
        provider
    }

    /// Append a reply to the queue.
    pub async fn push(&self, reply: MockReply) {
        self.replies.lock().await.push_back(reply);
    }

    /// Requests seen so far, in order.
    pub async fn requests(&self) -> Vec<MessageRequest> {
        self.requests.lock().await.clone()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    fn response_from(reply: MockReply) -> Result<MessageResponse, LlmError> {
        match reply {
            MockReply::Text(text) => Ok(MessageResponse {
                id: format!("mock-{}", uuid::Uuid::new_v4()),
                content: vec![ResponseContentBlock::Text { text }],
                model: "mock".into(),
                stop_reason: Some("end_turn".into()),
                usage: ApiUsage { input_tokens: 10, output_tokens: 20 },
            }),
            MockReply::ToolUse { name, input } => Ok(MessageResponse {
                id: format!("mock-{}", uuid::Uuid::new_v4()),
                content: vec![ResponseContentBlock::ToolUse {
                    id: format!("toolu-{}", uuid::Uuid::new_v4()),
                    name,
                    input,
                }],
                model: "mock".into(),
                stop_reason: Some("tool_use".into()),
                usage: ApiUsage { input_tokens: 10, output_tokens: 20 },
            }),
            MockReply::TransportFailure => {
                Err(LlmError::HttpStatus { code: 529, body: "overloaded".into() })
            },
        }
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn complete(&self, request: MessageRequest) -> Result<MessageResponse, LlmError> {
        self.requests.lock().await.push(request);
        if self.always_fail.load(std::sync::atomic::Ordering::Relaxed) {
            return Err(LlmError::HttpStatus { code: 529, body: "overloaded".into() });
        }
        let reply = self
            .replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| MockReply::Text("mock reply".into()));
        Self::response_from(reply)
    }
}
