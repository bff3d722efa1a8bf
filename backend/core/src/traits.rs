use anyhow::Result;
use async_trait::async_trait;

use crate::message::ChatMessage;
use crate::tools::{ToolCallRequest, ToolDefinition};

/// Trait for chat-completion backends driving the assistant.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., "openai", "scripted").
    fn name(&self) -> &str;

    /// Send the conversation and return either text or tool calls.
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse>;
}

/// Request to an LLM provider.
///
/// `messages` is the full working history, system prompt first. An empty
/// `tools` list means the backend must answer in text.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// Response from an LLM provider.
#[derive(Debug, Clone, Default)]
pub struct LlmResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCallRequest>,
    pub provider: String,
    pub model: String,
    pub tokens_used: u64,
    pub latency_ms: u64,
}

impl LlmResponse {
    /// A final answer carries no further tool calls.
    pub fn is_final(&self) -> bool {
        self.tool_calls.is_empty()
    }
}
