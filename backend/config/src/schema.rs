//! OpenCLI assistant configuration schema.
//!
//! Every field is optional on disk; [`crate::defaults`] fills the gaps and the
//! accessors below fall back to the same defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use opencli_core::ApprovalMode;
use serde::{Deserialize, Serialize};

use crate::defaults::{
    DEFAULT_API_KEY_ENV, DEFAULT_BACKEND_TIMEOUT_SECS, DEFAULT_BASE_URL,
    DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_HISTORY_LIMIT, DEFAULT_LOG_LEVEL,
    DEFAULT_MAX_OUTPUT_BYTES, DEFAULT_MAX_TOOL_STEPS, DEFAULT_MODEL,
};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantConfig {
    /// Chat model id sent to the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Environment variable holding the API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Explicit API key (usually `${VAR}`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Non-system messages kept after truncation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_limit: Option<usize>,

    /// Backend round-trips offering tools per user turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tool_steps: Option<usize>,

    /// Child process timeout, 0 disables
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_timeout_secs: Option<u64>,

    /// Backend request timeout, 0 disables
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_timeout_secs: Option<u64>,

    /// Captured bytes per output stream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_bytes: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval: Option<ApprovalMode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. "warn" or "opencli_agent=debug"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Directory for the rolling JSON log
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

// ---------------------------------------------------------------------------
// Accessors
// ---------------------------------------------------------------------------

fn secs(value: u64) -> Option<Duration> {
    (value > 0).then(|| Duration::from_secs(value))
}

impl AssistantConfig {
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn api_key_env(&self) -> &str {
        self.api_key_env.as_deref().unwrap_or(DEFAULT_API_KEY_ENV)
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit.unwrap_or(DEFAULT_HISTORY_LIMIT)
    }

    pub fn max_tool_steps(&self) -> usize {
        self.max_tool_steps.unwrap_or(DEFAULT_MAX_TOOL_STEPS)
    }

    pub fn command_timeout_secs(&self) -> u64 {
        self.command_timeout_secs
            .unwrap_or(DEFAULT_COMMAND_TIMEOUT_SECS)
    }

    pub fn backend_timeout(&self) -> Option<Duration> {
        secs(
            self.backend_timeout_secs
                .unwrap_or(DEFAULT_BACKEND_TIMEOUT_SECS),
        )
    }

    pub fn max_output_bytes(&self) -> usize {
        self.max_output_bytes.unwrap_or(DEFAULT_MAX_OUTPUT_BYTES)
    }

    pub fn approval(&self) -> ApprovalMode {
        self.approval.unwrap_or_default()
    }

    pub fn log_level(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// Log directory, defaulting to `<config_dir>/logs`.
    pub fn log_dir(&self, config_dir: &Path) -> PathBuf {
        self.logging
            .as_ref()
            .and_then(|l| l.dir.as_deref())
            .map(PathBuf::from)
            .unwrap_or_else(|| config_dir.join("logs"))
    }
}
