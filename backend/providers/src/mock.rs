use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use opencli_core::{LlmProvider, LlmRequest, LlmResponse, ToolCallRequest};
use serde_json::Value;

enum Step {
    Respond(LlmResponse),
    Fail(String),
}

/// A provider that replays a script of canned responses and records every
/// request it receives. Once the script runs out it answers with a fixed text.
pub struct ScriptedProvider {
    name: String,
    script: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<LlmRequest>>,
    fixed_response: Option<String>,
}

impl ScriptedProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            fixed_response: None,
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.fixed_response = Some(response.into());
        self
    }

    /// Queue a final text answer.
    pub fn then_text(self, content: impl Into<String>) -> Self {
        let response = LlmResponse {
            content: content.into(),
            ..self.base_response()
        };
        self.push(Step::Respond(response))
    }

    /// Queue a response asking for tools, given as `(name, arguments)` pairs.
    pub fn then_tool_calls(self, calls: Vec<(&str, Value)>) -> Self {
        let offset = self.script_len();
        let tool_calls = calls
            .into_iter()
            .enumerate()
            .map(|(i, (name, args))| {
                ToolCallRequest::new(format!("call_{}_{}", offset, i), name, args)
            })
            .collect();
        let response = LlmResponse {
            tool_calls,
            ..self.base_response()
        };
        self.push(Step::Respond(response))
    }

    /// Queue a backend failure.
    pub fn then_error(self, message: impl Into<String>) -> Self {
        self.push(Step::Fail(message.into()))
    }

    /// Every request seen so far, in order.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn remaining(&self) -> usize {
        self.script_len()
    }

    fn push(self, step: Step) -> Self {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(step);
        self
    }

    fn script_len(&self) -> usize {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    fn base_response(&self) -> LlmResponse {
        LlmResponse {
            provider: self.name.clone(),
            model: "scripted".to_string(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request.clone());

        let step = self
            .script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();

        match step {
            Some(Step::Respond(response)) => Ok(response),
            Some(Step::Fail(message)) => anyhow::bail!(message),
            None => Ok(LlmResponse {
                content: self
                    .fixed_response
                    .clone()
                    .unwrap_or_else(|| "Mock response".to_string()),
                ..self.base_response()
            }),
        }
    }
}
