//! Core assistant execution loop.
//!
//! One user line per turn. Inside a turn the backend may ask for tools any
//! number of times, bounded by `max_tool_steps`, before it answers in text.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use opencli_core::{
    ChatMessage, LlmProvider, LlmRequest, LlmResponse, OpenCliError, Role, ToolCallRequest,
    ToolDefinition,
};
use opencli_logging::{AgentEvent, EventLogger};
use tracing::{debug, error, info, instrument, warn};

use crate::console::Console;
use crate::history::ConversationHistory;
use crate::tool_dispatcher::ToolDispatcher;

pub const USER_PROMPT: &str = "You > ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    AwaitingInput,
    Sending,
    AwaitingToolApproval,
    Receiving,
    Closed,
}

/// Result of a single backend step.
#[derive(Debug, Clone)]
pub enum StepResult {
    /// The backend answered in text.
    Response(String),
    /// The backend asked for tools; run them and ask again.
    ToolCalls(Vec<ToolCallRequest>),
}

impl From<LlmResponse> for StepResult {
    fn from(response: LlmResponse) -> Self {
        if response.is_final() {
            StepResult::Response(response.content)
        } else {
            StepResult::ToolCalls(response.tool_calls)
        }
    }
}

/// What a user turn came to.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// Blank input, nothing sent.
    Skipped,
    Answered(String),
    /// The backend failed; history is as it was before the turn.
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub model: String,
    pub history_limit: usize,
    pub max_tool_steps: usize,
    pub backend_timeout: Option<Duration>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            model: "o3-mini".to_string(),
            history_limit: 10,
            max_tool_steps: 10,
            backend_timeout: None,
            max_tokens: None,
            temperature: None,
        }
    }
}

pub struct AssistantLoop {
    provider: Arc<dyn LlmProvider>,
    dispatcher: ToolDispatcher,
    history: ConversationHistory,
    config: LoopConfig,
    state: LoopState,
    session_id: String,
}

impl AssistantLoop {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        dispatcher: ToolDispatcher,
        system_prompt: impl Into<String>,
        config: LoopConfig,
    ) -> Self {
        let session_id = uuid::Uuid::new_v4().to_string();
        Self {
            provider,
            dispatcher: dispatcher.with_session(session_id.clone()),
            history: ConversationHistory::with_system_prompt(system_prompt),
            config,
            state: LoopState::AwaitingInput,
            session_id,
        }
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn dispatcher(&self) -> &ToolDispatcher {
        &self.dispatcher
    }

    /// Read lines until end of input. Backend failures end the turn, not the
    /// session. An unreadable line is skipped; other console I/O errors are
    /// returned.
    pub async fn run(&mut self, console: &mut dyn Console) -> Result<()> {
        info!(model = %self.config.model, "Starting assistant loop");
        loop {
            self.set_state(LoopState::AwaitingInput);
            let line = match console.read_line(USER_PROMPT).await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    warn!(error = %e, "Skipping unreadable input line");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            self.handle_turn(&line, console).await;
        }
        self.set_state(LoopState::Closed);
        info!("Input closed; assistant loop finished");
        Ok(())
    }

    /// Process one line of user input through to the final answer.
    #[instrument(skip_all, fields(session_id = %self.session_id))]
    pub async fn handle_turn(&mut self, input: &str, console: &mut dyn Console) -> TurnOutcome {
        if input.trim().is_empty() {
            return TurnOutcome::Skipped;
        }

        let before_turn = self.history.clone();
        self.history.append(Role::User, Some(input));
        self.history = self.history.truncate(self.config.history_limit);
        EventLogger::log_event(
            &self.session_id,
            AgentEvent::Message {
                role: Role::User.to_string(),
                content: input.to_string(),
            },
        );

        match self.complete_turn(console).await {
            Ok(answer) => {
                console.write_line(&format!("AI > {answer}"));
                EventLogger::log_event(
                    &self.session_id,
                    AgentEvent::Message {
                        role: Role::Assistant.to_string(),
                        content: answer.clone(),
                    },
                );
                self.history.push(ChatMessage::assistant(answer.clone()));
                TurnOutcome::Answered(answer)
            }
            Err(e) => {
                let message = e.to_string();
                error!(error = %message, "Turn failed");
                EventLogger::log_event(
                    &self.session_id,
                    AgentEvent::Error {
                        error_msg: message.clone(),
                    },
                );
                console.write_line(&format!("AI > [error] {message}"));
                self.history = before_turn;
                TurnOutcome::Failed(message)
            }
        }
    }

    async fn complete_turn(&mut self, console: &mut dyn Console) -> Result<String, OpenCliError> {
        let tools = self.dispatcher.definitions();
        let mut step_count = 0;

        loop {
            let offer_tools = step_count < self.config.max_tool_steps;
            if !offer_tools {
                warn!(
                    "Max tool steps ({}) reached, asking for a final answer",
                    self.config.max_tool_steps
                );
            }
            step_count += 1;
            debug!("Assistant step {}", step_count);

            let request = self.request(if offer_tools { tools.clone() } else { Vec::new() });
            let response = self.send(&request).await?;
            self.set_state(LoopState::Receiving);

            if !offer_tools {
                return Ok(response.content);
            }

            let content = response.content.clone();
            match StepResult::from(response) {
                StepResult::Response(text) => return Ok(text),
                StepResult::ToolCalls(calls) => {
                    info!("Backend invoked {} tools", calls.len());
                    if !content.trim().is_empty() {
                        console.write_line(&format!("AI > {content}"));
                    }
                    self.history
                        .push(ChatMessage::assistant_tool_calls(content, calls.clone()));
                    for call in &calls {
                        let output = self.execute_tool_call(call, console).await;
                        self.history.push(ChatMessage::tool_result(&call.id, output));
                    }
                }
            }
        }
    }

    /// Run one call in the order the backend listed it.
    async fn execute_tool_call(&mut self, call: &ToolCallRequest, console: &mut dyn Console) -> String {
        let invocation = match self.dispatcher.decode(call) {
            Ok(invocation) => invocation,
            Err(text) => return text,
        };
        if self.dispatcher.needs_confirmation(&invocation) {
            self.set_state(LoopState::AwaitingToolApproval);
            if !self.dispatcher.confirm(&invocation, console).await {
                return ToolDispatcher::declined_text(&invocation);
            }
        }
        self.dispatcher.run(&invocation, console).await
    }

    async fn send(&mut self, request: &LlmRequest) -> Result<LlmResponse, OpenCliError> {
        self.set_state(LoopState::Sending);
        let provider = self.provider.name().to_string();
        let call = self.provider.complete(request);

        let result = match self.config.backend_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => {
                    return Err(OpenCliError::Timeout(format!(
                        "{provider} did not answer within {}s",
                        limit.as_secs_f32()
                    )));
                }
            },
            None => call.await,
        };

        result.map_err(|e| OpenCliError::Backend {
            provider,
            message: format!("{e:#}"),
        })
    }

    fn request(&self, tools: Vec<ToolDefinition>) -> LlmRequest {
        LlmRequest {
            model: self.config.model.clone(),
            messages: self.history.messages().to_vec(),
            tools,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        }
    }

    fn set_state(&mut self, state: LoopState) {
        if self.state != state {
            debug!(from = ?self.state, to = ?state, "Loop state");
            self.state = state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::ScriptedConsole;
    use async_trait::async_trait;
    use opencli_core::ApprovalMode;
    use opencli_providers::ScriptedProvider;
    use opencli_tools::{CommandRunner, DirectoryContext, RunnerConfig};
    use serde_json::json;
    use std::path::PathBuf;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("opencli-loop-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.canonicalize().unwrap()
    }

    fn assistant(
        provider: Arc<dyn LlmProvider>,
        approval: ApprovalMode,
        config: LoopConfig,
    ) -> AssistantLoop {
        let dispatcher = ToolDispatcher::new(
            CommandRunner::new(RunnerConfig::default()),
            DirectoryContext::new(temp_dir()),
            approval,
        );
        AssistantLoop::new(provider, dispatcher, "sys", config)
    }

    fn contents(messages: &[ChatMessage]) -> Vec<&str> {
        messages.iter().map(|m| m.content.as_str()).collect()
    }

    #[tokio::test]
    async fn blank_input_is_skipped() {
        let provider = Arc::new(ScriptedProvider::new("mock"));
        let mut a = assistant(provider.clone(), ApprovalMode::Advisory, LoopConfig::default());
        let outcome = a.handle_turn("   ", &mut ScriptedConsole::default()).await;
        assert_eq!(outcome, TurnOutcome::Skipped);
        assert_eq!(a.history().len(), 1);
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn run_answers_until_end_of_input() {
        let provider = Arc::new(ScriptedProvider::new("mock").then_text("Hi!").then_text("Bye."));
        let mut a = assistant(provider.clone(), ApprovalMode::Advisory, LoopConfig::default());
        let mut console = ScriptedConsole::new(["hello", "", "goodbye"]);

        a.run(&mut console).await.unwrap();

        assert_eq!(a.state(), LoopState::Closed);
        assert_eq!(provider.requests().len(), 2);
        assert_eq!(
            console.transcript(),
            ["You > ", "AI > Hi!", "You > ", "You > ", "AI > Bye.", "You > "]
        );
        assert_eq!(
            contents(a.history().messages()),
            vec!["sys", "hello", "Hi!", "goodbye", "Bye."]
        );
    }

    /// Fails its first read with `kind`, then replays the scripted lines.
    struct FailingOnceConsole {
        kind: Option<io::ErrorKind>,
        inner: ScriptedConsole,
    }

    #[async_trait]
    impl Console for FailingOnceConsole {
        async fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
            if let Some(kind) = self.kind.take() {
                self.inner.write_line(prompt);
                return Err(io::Error::new(kind, "stream did not contain valid UTF-8"));
            }
            self.inner.read_line(prompt).await
        }

        fn write_line(&mut self, line: &str) {
            self.inner.write_line(line);
        }
    }

    #[tokio::test]
    async fn unreadable_line_is_skipped() {
        let provider = Arc::new(ScriptedProvider::new("mock").then_text("Hi!"));
        let mut a = assistant(provider.clone(), ApprovalMode::Advisory, LoopConfig::default());
        let mut console = FailingOnceConsole {
            kind: Some(io::ErrorKind::InvalidData),
            inner: ScriptedConsole::new(["second line"]),
        };

        a.run(&mut console).await.unwrap();

        assert_eq!(a.state(), LoopState::Closed);
        assert_eq!(
            console.inner.transcript(),
            ["You > ", "You > ", "AI > Hi!", "You > "]
        );
        assert_eq!(
            contents(a.history().messages()),
            vec!["sys", "second line", "Hi!"]
        );
    }

    #[tokio::test]
    async fn broken_console_ends_the_session() {
        let provider = Arc::new(ScriptedProvider::new("mock"));
        let mut a = assistant(provider.clone(), ApprovalMode::Advisory, LoopConfig::default());
        let mut console = FailingOnceConsole {
            kind: Some(io::ErrorKind::BrokenPipe),
            inner: ScriptedConsole::new(["never read"]),
        };

        assert!(a.run(&mut console).await.is_err());
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn eleventh_message_evicts_oldest() {
        let mut provider = ScriptedProvider::new("mock");
        for i in 1..=6 {
            provider = provider.then_text(format!("a{i}"));
        }
        let provider = Arc::new(provider);
        let mut a = assistant(provider.clone(), ApprovalMode::Advisory, LoopConfig::default());
        let mut console = ScriptedConsole::default();

        for i in 1..=6 {
            a.handle_turn(&format!("u{i}"), &mut console).await;
        }

        // The sixth request carried system + the ten newest messages.
        let sent = &provider.requests()[5].messages;
        assert_eq!(sent.len(), 11);
        assert_eq!(
            contents(sent),
            vec!["sys", "a1", "u2", "a2", "u3", "a3", "u4", "a4", "u5", "a5", "u6"]
        );
        assert_eq!(sent[0].role, Role::System);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn tool_calls_run_in_order_and_feed_back() {
        let provider = Arc::new(
            ScriptedProvider::new("mock")
                .then_tool_calls(vec![
                    ("cur_dir", json!({"newDirectory": "/tmp"})),
                    ("exe", json!({"targetFilePath": "pwd", "arguments": ["-P"]})),
                ])
                .then_text("You are in /tmp."),
        );
        let mut a = assistant(provider.clone(), ApprovalMode::Advisory, LoopConfig::default());
        let mut console = ScriptedConsole::default();

        let outcome = a.handle_turn("go to /tmp and show where we are", &mut console).await;
        assert_eq!(outcome, TurnOutcome::Answered("You are in /tmp.".into()));

        let tmp = std::fs::canonicalize("/tmp").unwrap().display().to_string();
        let messages = a.history().messages();
        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::Tool, Role::Tool, Role::Assistant]
        );
        assert_eq!(messages[2].tool_calls.len(), 2);
        assert_eq!(messages[3].tool_call_id.as_deref(), Some("call_0_0"));
        assert_eq!(messages[3].content, tmp);
        assert_eq!(messages[4].tool_call_id.as_deref(), Some("call_0_1"));
        assert_eq!(messages[4].content.trim(), tmp);

        // The second request carried both results, in call order.
        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].messages.len(), 5);
        assert!(!requests[1].tools.is_empty());
        assert!(console.saw("OS > Executing pwd -P..."));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn declined_command_is_reported_not_run() {
        let provider = Arc::new(
            ScriptedProvider::new("mock")
                .then_tool_calls(vec![(
                    "exe",
                    json!({"targetFilePath": "touch", "arguments": ["marker"], "changesSystem": true}),
                )])
                .then_text("Okay, I won't."),
        );
        let mut a = assistant(provider.clone(), ApprovalMode::Declared, LoopConfig::default());
        let mut console = ScriptedConsole::new(["n"]);

        a.handle_turn("make a marker", &mut console).await;

        let dir = a.dispatcher().directory().current();
        assert!(!dir.join("marker").exists());
        assert!(console.saw("OS > Run touch marker? [y/N] "));
        assert!(!console.saw("OS > Executing"));
        let tool_msg = &a.history().messages()[3];
        assert_eq!(tool_msg.role, Role::Tool);
        assert!(tool_msg.content.contains("declined"));
    }

    #[tokio::test]
    async fn bad_tool_call_is_told_to_the_model() {
        let provider = Arc::new(
            ScriptedProvider::new("mock")
                .then_tool_calls(vec![("exe", json!("not an object"))])
                .then_text("Sorry."),
        );
        let mut a = assistant(provider.clone(), ApprovalMode::Advisory, LoopConfig::default());
        let outcome = a.handle_turn("run it", &mut ScriptedConsole::default()).await;
        assert_eq!(outcome, TurnOutcome::Answered("Sorry.".into()));
        assert!(a.history().messages()[3].content.starts_with("Error: "));
    }

    #[tokio::test]
    async fn backend_error_restores_history_and_session_continues() {
        let provider = Arc::new(
            ScriptedProvider::new("mock")
                .then_error("503 Service Unavailable")
                .then_text("Back again."),
        );
        let mut a = assistant(provider.clone(), ApprovalMode::Advisory, LoopConfig::default());
        let mut console = ScriptedConsole::new(["first", "second"]);

        a.run(&mut console).await.unwrap();

        assert!(console.saw("AI > [error]"));
        assert!(console.saw("503 Service Unavailable"));
        assert!(console.saw("AI > Back again."));
        assert_eq!(
            contents(a.history().messages()),
            vec!["sys", "second", "Back again."]
        );
    }

    #[tokio::test]
    async fn tool_steps_are_bounded() {
        let mut provider = ScriptedProvider::new("mock");
        for _ in 0..5 {
            provider = provider.then_tool_calls(vec![("cur_dir", json!({}))]);
        }
        let provider = Arc::new(provider);
        let config = LoopConfig {
            max_tool_steps: 2,
            ..LoopConfig::default()
        };
        let mut a = assistant(provider.clone(), ApprovalMode::Advisory, config);

        let outcome = a.handle_turn("loop forever", &mut ScriptedConsole::default()).await;

        let requests = provider.requests();
        assert_eq!(requests.len(), 3);
        assert!(!requests[1].tools.is_empty());
        assert!(requests[2].tools.is_empty());
        // The third scripted step answered with tool calls and no text.
        assert_eq!(outcome, TurnOutcome::Answered(String::new()));
    }

    struct SlowProvider;

    #[async_trait]
    impl LlmProvider for SlowProvider {
        fn name(&self) -> &str {
            "slow"
        }

        async fn complete(&self, _request: &LlmRequest) -> anyhow::Result<LlmResponse> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(LlmResponse::default())
        }
    }

    #[tokio::test]
    async fn backend_timeout_fails_the_turn() {
        let config = LoopConfig {
            backend_timeout: Some(Duration::from_millis(50)),
            ..LoopConfig::default()
        };
        let mut a = assistant(Arc::new(SlowProvider), ApprovalMode::Advisory, config);
        let mut console = ScriptedConsole::default();

        let outcome = a.handle_turn("hello?", &mut console).await;

        match outcome {
            TurnOutcome::Failed(msg) => assert!(msg.contains("timed out"), "{msg}"),
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(a.history().len(), 1);
    }
}
