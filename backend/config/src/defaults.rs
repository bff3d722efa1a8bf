//! Config defaults: applies default values to parsed config.

use crate::schema::{AssistantConfig, LoggingConfig};

pub const DEFAULT_MODEL: &str = "o3-mini";

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Non-system messages kept when the history is truncated.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Backend round-trips offering tools within one user turn.
pub const DEFAULT_MAX_TOOL_STEPS: usize = 10;

pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 120;

pub const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 120;

pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 200_000;

/// Console stays quiet so diagnostics don't interleave with the chat.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: AssistantConfig) -> AssistantConfig {
    let config = apply_backend_defaults(config);
    let config = apply_loop_defaults(config);
    apply_logging_defaults(config)
}

fn apply_backend_defaults(mut config: AssistantConfig) -> AssistantConfig {
    config.model.get_or_insert_with(|| DEFAULT_MODEL.to_string());
    config
        .base_url
        .get_or_insert_with(|| DEFAULT_BASE_URL.to_string());
    config
        .api_key_env
        .get_or_insert_with(|| DEFAULT_API_KEY_ENV.to_string());
    config
        .backend_timeout_secs
        .get_or_insert(DEFAULT_BACKEND_TIMEOUT_SECS);
    config
}

fn apply_loop_defaults(mut config: AssistantConfig) -> AssistantConfig {
    config.history_limit.get_or_insert(DEFAULT_HISTORY_LIMIT);
    config.max_tool_steps.get_or_insert(DEFAULT_MAX_TOOL_STEPS);
    config
        .command_timeout_secs
        .get_or_insert(DEFAULT_COMMAND_TIMEOUT_SECS);
    config
        .max_output_bytes
        .get_or_insert(DEFAULT_MAX_OUTPUT_BYTES);
    config.approval.get_or_insert_with(Default::default);
    config
}

fn apply_logging_defaults(mut config: AssistantConfig) -> AssistantConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    if logging.level.is_none() {
        logging.level = Some(DEFAULT_LOG_LEVEL.to_string());
    }
    config
}
