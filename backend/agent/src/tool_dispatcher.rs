//! Dispatcher for the model's tool calls.
//!
//! Decodes each call into a [`ToolInvocation`], applies the approval gate and
//! runs it. Every failure is folded into the text handed back to the model.

use opencli_core::{ApprovalMode, OpenCliError, ToolCallRequest, ToolDefinition};
use opencli_logging::{AgentEvent, EventLogger};
use opencli_tools::{definitions, CommandRunner, DirectoryContext, ToolInvocation};
use tracing::{debug, warn};

use crate::console::Console;

pub struct ToolDispatcher {
    runner: CommandRunner,
    directory: DirectoryContext,
    approval: ApprovalMode,
    session_id: String,
}

impl ToolDispatcher {
    pub fn new(runner: CommandRunner, directory: DirectoryContext, approval: ApprovalMode) -> Self {
        Self {
            runner,
            directory,
            approval,
            session_id: String::new(),
        }
    }

    /// Tag emitted events with this session.
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        definitions()
    }

    pub fn directory(&self) -> &DirectoryContext {
        &self.directory
    }

    pub fn approval(&self) -> ApprovalMode {
        self.approval
    }

    /// Decode a call and record it. Decoding errors come back as tool text.
    pub fn decode(&self, call: &ToolCallRequest) -> Result<ToolInvocation, String> {
        match ToolInvocation::parse(call) {
            Ok(invocation) => {
                let risk = invocation.risk();
                EventLogger::log_event(
                    &self.session_id,
                    AgentEvent::ToolCall {
                        tool_name: call.name.clone(),
                        arguments_json: call.arguments.to_string(),
                        risk: format!("{:?}/{:?}", risk.class, risk.origin),
                    },
                );
                Ok(invocation)
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Rejected tool call");
                Err(error_text(&e))
            }
        }
    }

    pub fn needs_confirmation(&self, invocation: &ToolInvocation) -> bool {
        invocation.needs_confirmation(self.approval)
    }

    /// Ask the user whether `invocation` may run. Console failures decline.
    pub async fn confirm(&self, invocation: &ToolInvocation, console: &mut dyn Console) -> bool {
        let command = invocation.command_line();
        let approved = match console.confirm(&format!("OS > Run {command}? [y/N] ")).await {
            Ok(approved) => approved,
            Err(e) => {
                warn!(error = %e, "Could not read confirmation; declining");
                false
            }
        };
        EventLogger::log_event(
            &self.session_id,
            AgentEvent::Approval {
                tool_name: invocation.tool_name().to_string(),
                command,
                approved,
            },
        );
        approved
    }

    /// What the model is told when the user declines a call.
    pub fn declined_text(invocation: &ToolInvocation) -> String {
        format!(
            "The user declined to run `{}`. It was not executed.",
            invocation.command_line()
        )
    }

    /// Run an invocation and return the text the model should see.
    pub async fn run(&self, invocation: &ToolInvocation, console: &mut dyn Console) -> String {
        let output = match invocation {
            ToolInvocation::RunCommand {
                program, arguments, ..
            } => {
                console.write_line(&format!(
                    "OS > Executing {} {}...",
                    program,
                    arguments.join(" ")
                ));
                self.runner
                    .run(program, arguments, &self.directory)
                    .await
                    .unwrap_or_else(|e| error_text(&e))
            }
            ToolInvocation::GetOrSetDirectory { new_directory } => self
                .directory
                .get_or_set(new_directory.as_deref())
                .unwrap_or_else(|e| error_text(&e)),
        };
        debug!(tool = invocation.tool_name(), bytes = output.len(), "Tool finished");
        EventLogger::log_event(
            &self.session_id,
            AgentEvent::ToolResult {
                tool_name: invocation.tool_name().to_string(),
                output: output.clone(),
            },
        );
        output
    }
}

fn error_text(err: &OpenCliError) -> String {
    format!("Error: {err}")
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::console::ScriptedConsole;
    use opencli_tools::RunnerConfig;
    use serde_json::json;
    use std::path::PathBuf;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("opencli-dispatch-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.canonicalize().unwrap()
    }

    fn dispatcher(dir: &PathBuf, approval: ApprovalMode) -> ToolDispatcher {
        ToolDispatcher::new(
            CommandRunner::new(RunnerConfig::default()),
            DirectoryContext::new(dir),
            approval,
        )
    }

    fn call(name: &str, arguments: serde_json::Value) -> ToolCallRequest {
        ToolCallRequest::new("call_0", name, arguments)
    }

    /// Decode, gate and run one call, stopping at whichever step ends it.
    async fn dispatch(
        d: &ToolDispatcher,
        call: &ToolCallRequest,
        console: &mut ScriptedConsole,
    ) -> String {
        let invocation = match d.decode(call) {
            Ok(invocation) => invocation,
            Err(text) => return text,
        };
        if d.needs_confirmation(&invocation) && !d.confirm(&invocation, console).await {
            return ToolDispatcher::declined_text(&invocation);
        }
        d.run(&invocation, console).await
    }

    #[tokio::test]
    async fn exe_announces_and_returns_stdout() {
        let dir = temp_dir();
        let d = dispatcher(&dir, ApprovalMode::Advisory);
        let mut console = ScriptedConsole::default();
        let c = call("exe", json!({"targetFilePath": "echo", "arguments": ["hi", "there"]}));
        let out = dispatch(&d, &c, &mut console).await;
        assert_eq!(out.trim(), "hi there");
        assert_eq!(console.transcript(), ["OS > Executing echo hi there..."]);
    }

    #[tokio::test]
    async fn spawn_failure_becomes_error_text() {
        let dir = temp_dir();
        let d = dispatcher(&dir, ApprovalMode::Advisory);
        let c = call("exe", json!({"targetFilePath": "no-such-program-opencli", "arguments": []}));
        let out = dispatch(&d, &c, &mut ScriptedConsole::default()).await;
        assert!(out.starts_with("Error: "), "{out}");
        assert!(out.contains("no-such-program-opencli"));
    }

    #[tokio::test]
    async fn cur_dir_reads_and_changes() {
        let dir = temp_dir();
        std::fs::create_dir(dir.join("sub")).unwrap();
        let d = dispatcher(&dir, ApprovalMode::Always);
        let mut console = ScriptedConsole::default();

        let out = dispatch(&d, &call("cur_dir", json!({})), &mut console).await;
        assert_eq!(out, dir.display().to_string());

        let change = call("cur_dir", json!({"newDirectory": "sub"}));
        let out = dispatch(&d, &change, &mut console).await;
        assert_eq!(PathBuf::from(&out), dir.join("sub"));
        assert_eq!(d.directory().current(), dir.join("sub"));
        // Directory changes never ask.
        assert!(console.transcript().is_empty());
    }

    #[tokio::test]
    async fn bad_directory_is_error_text() {
        let dir = temp_dir();
        let d = dispatcher(&dir, ApprovalMode::Advisory);
        let c = call("cur_dir", json!({"newDirectory": "missing"}));
        let out = dispatch(&d, &c, &mut ScriptedConsole::default()).await;
        assert!(out.starts_with("Error: "));
        assert_eq!(d.directory().current(), dir);
    }

    #[tokio::test]
    async fn unknown_tool_is_rejected_at_decode() {
        let dir = temp_dir();
        let d = dispatcher(&dir, ApprovalMode::Advisory);
        let text = d.decode(&call("rm_rf", json!({}))).unwrap_err();
        assert!(text.starts_with("Error: "));
        assert!(text.contains("rm_rf"));
    }

    #[tokio::test]
    async fn declared_mode_gates_mutating_commands() {
        let dir = temp_dir();
        let d = dispatcher(&dir, ApprovalMode::Declared);
        let mut console = ScriptedConsole::new(["n"]);

        let touch = d
            .decode(&call(
                "exe",
                json!({"targetFilePath": "touch", "arguments": ["made"], "changesSystem": true}),
            ))
            .unwrap();
        assert!(d.needs_confirmation(&touch));
        assert!(!d.confirm(&touch, &mut console).await);
        assert_eq!(
            ToolDispatcher::declined_text(&touch),
            "The user declined to run `touch made`. It was not executed."
        );
        assert!(!dir.join("made").exists());
        assert_eq!(console.transcript(), ["OS > Run touch made? [y/N] "]);

        // Read-only declarations run without asking.
        let pwd = call("exe", json!({"targetFilePath": "pwd", "arguments": ["-P"], "changesSystem": false}));
        let out = dispatch(&d, &pwd, &mut console).await;
        assert_eq!(out.trim(), dir.display().to_string());
        assert_eq!(console.transcript().len(), 2);
    }

    #[tokio::test]
    async fn approved_command_runs() {
        let dir = temp_dir();
        let d = dispatcher(&dir, ApprovalMode::Always);
        let mut console = ScriptedConsole::new(["yes"]);
        let c = call("exe", json!({"targetFilePath": "touch", "arguments": ["made"]}));
        dispatch(&d, &c, &mut console).await;
        assert!(dir.join("made").exists());
        assert!(console.saw("OS > Executing touch made..."));
    }
}
