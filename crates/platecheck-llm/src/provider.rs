//! Chat provider trait
//!
//! The seam between the orchestration layer and concrete LLM backends.
//! Implementations are expected to apply their own request timeout and map
//! it to [`Error::Timeout`](crate::Error::Timeout).

use crate::completion::{CompletionRequest, CompletionResponse};
use crate::error::Result;

/// A chat-completion backend (text plus optional inline images in).
#[async_trait::async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider name (for logging)
    fn name(&self) -> &str;

    /// Default model identifier
    fn default_model(&self) -> &str;

    /// Complete a conversation
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
}
