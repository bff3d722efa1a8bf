//! Agent Event Logger
//!
//! Structured events (tool_call, tool_result, message, error) routed through
//! `tracing` on the `agent_events` target, redacted before they leave.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::redact::redact_sensitive_data;

/// Longest tool output kept in an event; the rest is elided.
const MAX_EVENT_TEXT: usize = 2_000;

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    ToolCall {
        tool_name: String,
        arguments_json: String,
        risk: String,
    },
    ToolResult {
        tool_name: String,
        output: String,
    },
    Approval {
        tool_name: String,
        command: String,
        approved: bool,
    },
    Message {
        role: String,
        content: String,
    },
    Error {
        error_msg: String,
    },
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: AgentEvent,
}

pub struct EventLogger;

impl EventLogger {
    /// Redact the event and hand it to the tracing system.
    pub fn log_event(session_id: &str, event: AgentEvent) {
        let entry = Self::entry(session_id, event);
        let json = serde_json::to_string(&entry).unwrap_or_else(|e| e.to_string());
        info!(target: "agent_events", session_id = %entry.session_id, event = %json, "Agent trace event");
    }

    /// Build a redacted, length-bounded log entry.
    pub fn entry(session_id: &str, mut event: AgentEvent) -> EventLogEntry {
        match &mut event {
            AgentEvent::ToolCall { arguments_json, .. } => {
                *arguments_json = redact_sensitive_data(arguments_json);
            }
            AgentEvent::ToolResult { output, .. } => {
                *output = clip(&redact_sensitive_data(output));
            }
            AgentEvent::Approval { command, .. } => {
                *command = redact_sensitive_data(command);
            }
            AgentEvent::Message { content, .. } => {
                *content = redact_sensitive_data(content);
            }
            AgentEvent::Error { error_msg } => {
                *error_msg = redact_sensitive_data(error_msg);
            }
        }

        EventLogEntry {
            session_id: session_id.into(),
            timestamp: Utc::now(),
            event,
        }
    }
}

fn clip(text: &str) -> String {
    if text.len() <= MAX_EVENT_TEXT {
        return text.to_string();
    }
    let mut end = MAX_EVENT_TEXT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}… ({} bytes elided)", &text[..end], text.len() - end)
}
