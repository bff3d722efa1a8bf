//! Config validation: field checks with user-friendly error messages.

use crate::schema::AssistantConfig;
use thiserror::Error;

/// Above this many tool steps per turn a runaway loop gets expensive.
const MAX_REASONABLE_TOOL_STEPS: usize = 50;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Log warnings and turn errors into a single failure.
    pub fn into_result(self) -> anyhow::Result<()> {
        for warning in &self.warnings {
            tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
        }
        if self.is_valid() {
            return Ok(());
        }
        let joined = self
            .errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        anyhow::bail!(joined)
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &AssistantConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_backend(config, &mut report);
    validate_loop(config, &mut report);
    report
}

fn validate_backend(config: &AssistantConfig, report: &mut ValidationReport) {
    if config.model().trim().is_empty() {
        report.error("model", "Model id cannot be empty");
    }

    let url = config.base_url();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        report.error("baseUrl", format!("Expected an http(s) URL, got '{url}'"));
    }

    if config.api_key_env().trim().is_empty() {
        report.error("apiKeyEnv", "Environment variable name cannot be empty");
    }

    if let Some(t) = config.temperature {
        if !(0.0..=2.0).contains(&t) {
            report.error("temperature", "Must be between 0.0 and 2.0");
        }
    }

    if config.max_tokens == Some(0) {
        report.error("maxTokens", "Must be greater than 0");
    }
}

fn validate_loop(config: &AssistantConfig, report: &mut ValidationReport) {
    if config.history_limit() == 0 {
        report.error(
            "historyLimit",
            "Must keep at least one message besides the system prompt",
        );
    }

    match config.max_tool_steps() {
        0 => report.error("maxToolSteps", "Must allow at least one tool step"),
        n if n > MAX_REASONABLE_TOOL_STEPS => report.warn(
            "maxToolSteps",
            format!("{n} tool steps per turn may run up large bills"),
        ),
        _ => {}
    }

    if config.max_output_bytes() == 0 {
        report.error("maxOutputBytes", "Must be greater than 0");
    }

    if config.command_timeout_secs() == 0 {
        report.warn("commandTimeoutSecs", "Commands may block the session forever");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::apply_all_defaults;

    #[test]
    fn defaults_are_valid() {
        let report = validate(&apply_all_defaults(AssistantConfig::default()));
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn zero_history_limit_is_error() {
        let cfg = AssistantConfig {
            history_limit: Some(0),
            ..Default::default()
        };
        let report = validate(&cfg);
        assert!(!report.is_valid());
        assert_eq!(report.errors[0].path, "historyLimit");
    }

    #[test]
    fn bad_url_and_temperature_reported_together() {
        let cfg = AssistantConfig {
            base_url: Some("ftp://example.com".into()),
            temperature: Some(3.5),
            ..Default::default()
        };
        let err = validate(&cfg).into_result().unwrap_err().to_string();
        assert!(err.contains("baseUrl"));
        assert!(err.contains("temperature"));
    }

    #[test]
    fn large_tool_steps_is_warning_only() {
        let cfg = AssistantConfig {
            max_tool_steps: Some(500),
            ..Default::default()
        };
        let report = validate(&cfg);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
    }
}
