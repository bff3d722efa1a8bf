use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How much a tool invocation is expected to change the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskClass {
    /// Only observes state.
    ReadOnly,
    /// Changes the assistant's own session state (e.g. its working directory).
    SessionState,
    /// Changes system state outside the session.
    Mutating,
    /// Nobody said.
    Unknown,
}

/// Where a [`RiskClass`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskOrigin {
    /// The model declared it in the tool call arguments.
    Declared,
    /// Derived from the tool variant itself.
    Heuristic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskTag {
    pub class: RiskClass,
    pub origin: RiskOrigin,
}

impl RiskTag {
    pub fn declared(class: RiskClass) -> Self {
        Self {
            class,
            origin: RiskOrigin::Declared,
        }
    }

    pub fn heuristic(class: RiskClass) -> Self {
        Self {
            class,
            origin: RiskOrigin::Heuristic,
        }
    }
}

/// When the assistant must stop and ask the user before running a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalMode {
    /// Never blocks. The system prompt asks the model to request approval.
    #[default]
    Advisory,
    /// Confirm commands the model declared as changing the system.
    Declared,
    /// Confirm every command.
    Always,
}

impl ApprovalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalMode::Advisory => "advisory",
            ApprovalMode::Declared => "declared",
            ApprovalMode::Always => "always",
        }
    }
}

impl fmt::Display for ApprovalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApprovalMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "advisory" => Ok(ApprovalMode::Advisory),
            "declared" => Ok(ApprovalMode::Declared),
            "always" => Ok(ApprovalMode::Always),
            other => Err(format!(
                "unknown approval mode '{other}' (expected advisory, declared or always)"
            )),
        }
    }
}
