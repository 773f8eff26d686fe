use async_trait::async_trait;

use crate::errors::DroidClawResult;
use crate::llm::types::{CallConfig, ChatMessage, LlmResponse, ToolDef};

/// Unified LLM provider trait. All providers implement this trait.
/// The HTTP provider lives in `providers/`; tests plug in scripted ones.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the provider's identifier (matches config.toml key).
    fn name(&self) -> &str;

    /// One non-streaming chat completion with `tool_choice = "auto"`.
    /// Any transport failure or non-2xx status is returned as an error.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDef],
        cfg: &CallConfig,
    ) -> DroidClawResult<LlmResponse>;
}
