use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use opencli_core::{
    ChatMessage, LlmProvider, LlmRequest, LlmResponse, Role, ToolCallRequest, ToolDefinition,
};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible chat-completions provider with function calling.
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunctionDef,
}

#[derive(Serialize)]
struct WireFunctionDef {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: Option<u64>,
}

fn function_kind() -> String {
    "function".to_string()
}

fn to_wire_message(msg: &ChatMessage) -> WireMessage {
    let content = if msg.content.is_empty() && !msg.tool_calls.is_empty() {
        None
    } else {
        Some(msg.content.clone())
    };
    WireMessage {
        role: msg.role.as_str(),
        content,
        tool_calls: msg.tool_calls.iter().map(to_wire_call).collect(),
        tool_call_id: if msg.role == Role::Tool {
            msg.tool_call_id.clone()
        } else {
            None
        },
    }
}

fn to_wire_call(call: &ToolCallRequest) -> WireToolCall {
    let arguments = match &call.arguments {
        Value::String(raw) => raw.clone(),
        Value::Null => "{}".to_string(),
        other => other.to_string(),
    };
    WireToolCall {
        id: call.id.clone(),
        kind: function_kind(),
        function: WireFunctionCall {
            name: call.name.clone(),
            arguments,
        },
    }
}

fn to_wire_tool(def: &ToolDefinition) -> WireTool {
    WireTool {
        kind: "function",
        function: WireFunctionDef {
            name: def.name.clone(),
            description: def.description.clone(),
            parameters: def.parameters.clone(),
        },
    }
}

fn from_wire_call(call: WireToolCall) -> ToolCallRequest {
    let raw = call.function.arguments;
    let arguments = if raw.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&raw).unwrap_or(Value::String(raw))
    };
    ToolCallRequest {
        id: call.id,
        name: call.function.name,
        arguments,
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let start = Instant::now();

        let body = ChatRequest {
            model: &request.model,
            messages: request.messages.iter().map(to_wire_message).collect(),
            tools: request.tools.iter().map(to_wire_tool).collect(),
            tool_choice: (!request.tools.is_empty()).then_some("auto"),
            max_completion_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        debug!(
            model = %request.model,
            messages = body.messages.len(),
            tools = body.tools.len(),
            "Sending request to OpenAI"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .context("OpenAI HTTP request failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI returned {}: {}", status, error_body);
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI response")?;

        let message = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .context("OpenAI response contained no choices")?;

        let tokens_used = chat_response
            .usage
            .and_then(|u| u.total_tokens)
            .unwrap_or(0);

        let latency_ms = start.elapsed().as_millis() as u64;

        Ok(LlmResponse {
            content: message.content.unwrap_or_default(),
            tool_calls: message
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(from_wire_call)
                .collect(),
            provider: "openai".to_string(),
            model: request.model.clone(),
            tokens_used,
            latency_ms,
        })
    }
}
