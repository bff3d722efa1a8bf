use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tool schema advertised to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Name the backend uses to call the tool (e.g., "exe").
    pub name: String,
    /// Description for the LLM prompt.
    pub description: String,
    /// JSON Schema for the tool's parameters.
    pub parameters: Value,
}

/// A structured tool invocation produced by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Backend-assigned id, echoed back on the tool result message.
    pub id: String,
    pub name: String,
    /// Arguments as decoded JSON. Undecodable argument strings are kept as a
    /// JSON string so the dispatcher can report them.
    pub arguments: Value,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}
