//! HTTP client for the Anthropic Messages API.

use async_trait::async_trait;

use crate::error::LlmError;
use crate::provider::LlmProvider;
use crate::types::{ApiErrorResponse, MessageRequest, MessageResponse};

/// Hard per-call timeout.
pub const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);
/// Retries after the first attempt, transport-class errors only.
const MAX_RETRIES: u32 = 2;
const API_VERSION: &str = "2023-06-01";

/// Client for the Messages API.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AnthropicClient {
    /// Creates a new client.
    ///
    /// # Errors
    /// Returns `LlmError::HttpRequest` if the underlying HTTP client cannot
    /// be constructed.
    pub fn new(api_key: String, base_url: String) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, api_key, base_url })
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send_once(&self, request: &MessageRequest) -> Result<MessageResponse, LlmError> {
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(REQUEST_TIMEOUT)
                } else {
                    LlmError::HttpRequest(e)
                }
            })?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            // Prefer the API's own message when the body parses.
            let detail = serde_json::from_str::<ApiErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::HttpStatus { code: status.as_u16(), body: detail });
        }

        let parsed: MessageResponse =
            serde_json::from_str(&body).map_err(|source| LlmError::JsonParse {
                context: format!(
                    "messages response, body: {}",
                    body.get(..500).unwrap_or(&body)
                ),
                source,
            })?;
        if parsed.content.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(parsed)
    }
}

#[async_trait]
impl LlmProvider for AnthropicClient {
    async fn complete(&self, request: MessageRequest) -> Result<MessageResponse, LlmError> {
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay = std::time::Duration::from_secs(1 << (attempt - 1));
                tokio::time::sleep(delay).await;
                tracing::warn!(attempt, max = MAX_RETRIES, ?delay, "LLM retry");
            }

            match self.send_once(&request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() => {
                    tracing::warn!(error = %e, "transient LLM failure");
                    last_error = Some(e);
                },
                Err(e) => return Err(e),
            }
        }

        Err(LlmError::RetriesExhausted(Box::new(
            last_error.unwrap_or(LlmError::EmptyResponse),
        )))
    }
}
