//! LLM Provider Trait
//!
//! The generation capability as the orchestration loop sees it: a transcript
//! and a scoped tool catalog go in, one assistant message (text and/or
//! requested actions) comes out.

use async_trait::async_trait;

use super::types::{LlmRequestOptions, LlmResponse, LlmResult, Message, ToolDefinition};

/// Trait that every generation backend implements.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the provider name for identification.
    fn name(&self) -> &'static str;

    /// Returns the current model being used.
    fn model(&self) -> &str;

    /// Send the transcript and get one complete response.
    ///
    /// # Arguments
    /// * `messages` - Conversation history
    /// * `system` - Optional system prompt
    /// * `tools` - Tools the model may request in this step
    async fn send_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        tools: Vec<ToolDefinition>,
        request_options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse>;

    /// Check if the provider is reachable.
    async fn health_check(&self) -> LlmResult<()> {
        Ok(())
    }
}
