//! LLM transport and structuring for quill.

mod client;
mod error;
pub mod mock;
mod provider;
mod structurer;
pub mod types;

pub use client::{AnthropicClient, REQUEST_TIMEOUT};
pub use error::LlmError;
pub use provider::LlmProvider;
pub use structurer::{strip_code_fence, StructureError, StructuredPatch, Structurer};
