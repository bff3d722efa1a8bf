//! The closed set of tools the model may call.
//!
//! Adding a tool means adding a variant here, its schema in [`definitions`],
//! and a handler in the agent's dispatcher.

use opencli_core::{
    ApprovalMode, OpenCliError, RiskClass, RiskTag, ToolCallRequest, ToolDefinition,
};
use serde::Deserialize;
use serde_json::{json, Value};

pub const EXE_TOOL: &str = "exe";
pub const CUR_DIR_TOOL: &str = "cur_dir";

#[derive(Debug, Clone, PartialEq)]
pub enum ToolInvocation {
    RunCommand {
        program: String,
        arguments: Vec<String>,
        /// The model's own claim about whether the command changes the system.
        changes_system: Option<bool>,
    },
    GetOrSetDirectory {
        new_directory: Option<String>,
    },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExeArgs {
    target_file_path: String,
    #[serde(default)]
    arguments: Option<Vec<String>>,
    #[serde(default)]
    changes_system: Option<bool>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct CurDirArgs {
    #[serde(default)]
    new_directory: Option<String>,
}

impl ToolInvocation {
    /// Decode a backend tool call into a typed invocation.
    pub fn parse(call: &ToolCallRequest) -> Result<Self, OpenCliError> {
        let invalid = |message: String| OpenCliError::InvalidToolArguments {
            tool: call.name.clone(),
            message,
        };

        match call.name.as_str() {
            EXE_TOOL => {
                let args: ExeArgs = decode(&call.arguments).map_err(invalid)?;
                if args.target_file_path.trim().is_empty() {
                    return Err(invalid("targetFilePath must not be empty".to_string()));
                }
                Ok(ToolInvocation::RunCommand {
                    program: args.target_file_path,
                    arguments: args.arguments.unwrap_or_default(),
                    changes_system: args.changes_system,
                })
            }
            CUR_DIR_TOOL => {
                let args: CurDirArgs = if call.arguments.is_null() {
                    CurDirArgs::default()
                } else {
                    decode(&call.arguments).map_err(invalid)?
                };
                Ok(ToolInvocation::GetOrSetDirectory {
                    new_directory: args.new_directory.filter(|d| !d.is_empty()),
                })
            }
            other => Err(OpenCliError::UnknownTool(other.to_string())),
        }
    }

    pub fn tool_name(&self) -> &'static str {
        match self {
            ToolInvocation::RunCommand { .. } => EXE_TOOL,
            ToolInvocation::GetOrSetDirectory { .. } => CUR_DIR_TOOL,
        }
    }

    pub fn risk(&self) -> RiskTag {
        match self {
            ToolInvocation::RunCommand { changes_system, .. } => RiskTag::declared(match changes_system {
                Some(true) => RiskClass::Mutating,
                Some(false) => RiskClass::ReadOnly,
                None => RiskClass::Unknown,
            }),
            ToolInvocation::GetOrSetDirectory { new_directory: None } => {
                RiskTag::heuristic(RiskClass::ReadOnly)
            }
            ToolInvocation::GetOrSetDirectory { new_directory: Some(_) } => {
                RiskTag::heuristic(RiskClass::SessionState)
            }
        }
    }

    /// Whether `mode` requires the user to confirm this invocation first.
    pub fn needs_confirmation(&self, mode: ApprovalMode) -> bool {
        match (self, mode) {
            (ToolInvocation::GetOrSetDirectory { .. }, _) => false,
            (_, ApprovalMode::Advisory) => false,
            (_, ApprovalMode::Always) => true,
            (_, ApprovalMode::Declared) => self.risk().class == RiskClass::Mutating,
        }
    }

    /// Command line as shown to the user, e.g. `git status --short`.
    pub fn command_line(&self) -> String {
        match self {
            ToolInvocation::RunCommand { program, arguments, .. } => {
                if arguments.is_empty() {
                    program.clone()
                } else {
                    format!("{} {}", program, arguments.join(" "))
                }
            }
            ToolInvocation::GetOrSetDirectory { new_directory } => match new_directory {
                Some(dir) => format!("cd {dir}"),
                None => "pwd".to_string(),
            },
        }
    }
}

fn decode<T: for<'de> Deserialize<'de>>(arguments: &Value) -> Result<T, String> {
    match arguments {
        Value::String(raw) => Err(format!("arguments are not a JSON object: {raw}")),
        other => serde_json::from_value(other.clone()).map_err(|e| e.to_string()),
    }
}

/// Schemas advertised to the backend for every tool in the set.
pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: EXE_TOOL.to_string(),
            description: "Execute a cli command, the targetFilePath could be full path or an exe like git, powershell.exe, etc".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "targetFilePath": {
                        "type": "string",
                        "description": "Program to run: a name found on PATH or a path to an executable"
                    },
                    "arguments": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Arguments passed to the program verbatim, without shell interpretation"
                    },
                    "changesSystem": {
                        "type": "boolean",
                        "description": "Set to true if the command will change the system (install, delete, write, configure)"
                    }
                },
                "required": ["targetFilePath", "arguments"]
            }),
        },
        ToolDefinition {
            name: CUR_DIR_TOOL.to_string(),
            description: "Get or change the current directory".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "newDirectory": {
                        "type": ["string", "null"],
                        "description": "Directory to switch to; omit to just read the current directory"
                    }
                }
            }),
        },
    ]
}
