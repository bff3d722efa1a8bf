//! Environment handling for config values.
//!
//! - `${VAR_NAME}` in any string value is replaced at load time
//!   (uppercase `[A-Z_][A-Z0-9_]*` names only); `$${VAR}` stays literal `${VAR}`.
//! - `OPENCLI_*` variables override individual fields.

use std::collections::HashMap;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use opencli_core::ApprovalMode;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::schema::AssistantConfig;

/// `${VAR}`, optionally preceded by an escaping `$`.
static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\$)?\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

pub const ENV_MODEL: &str = "OPENCLI_MODEL";
pub const ENV_BASE_URL: &str = "OPENCLI_BASE_URL";
pub const ENV_HISTORY_LIMIT: &str = "OPENCLI_HISTORY_LIMIT";
pub const ENV_APPROVAL: &str = "OPENCLI_APPROVAL";

/// Error returned for missing env vars.
#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Names of all `${VAR}` references in a value tree, sorted and deduplicated.
/// Escaped `$${VAR}` references are not included.
pub fn referenced_vars(value: &Value) -> Vec<String> {
    let mut vars = Vec::new();
    collect_vars(value, &mut vars);
    vars.sort();
    vars.dedup();
    vars
}

fn collect_vars(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.extend(
            ENV_VAR_PATTERN
                .captures_iter(s)
                .filter(|caps| caps.get(1).is_none())
                .map(|caps| caps[2].to_string()),
        ),
        Value::Array(arr) => arr.iter().for_each(|v| collect_vars(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_vars(v, out)),
        _ => {}
    }
}

/// Substitute `${VAR}` references using a provided map (useful for testing).
pub fn resolve_env_vars_with(
    value: &Value,
    env: &HashMap<String, String>,
) -> Result<Value, MissingEnvVarError> {
    substitute_value(value, env, "")
}

fn substitute_value(
    value: &Value,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<Value, MissingEnvVarError> {
    match value {
        Value::String(s) => Ok(Value::String(substitute_string(s, env, path)?)),
        Value::Array(arr) => arr
            .iter()
            .enumerate()
            .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (k, v) in map {
                let child_path = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                result.insert(k.clone(), substitute_value(v, env, &child_path)?);
            }
            Ok(Value::Object(result))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(
    s: &str,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<String, MissingEnvVarError> {
    if !s.contains("${") {
        return Ok(s.to_string());
    }

    let mut missing = None;
    let substituted = ENV_VAR_PATTERN.replace_all(s, |caps: &Captures| {
        let name = &caps[2];
        if caps.get(1).is_some() {
            return format!("${{{name}}}");
        }
        match env.get(name) {
            Some(val) if !val.is_empty() => val.clone(),
            _ => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: name.to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });

    match missing {
        Some(err) => Err(err),
        None => Ok(substituted.into_owned()),
    }
}

/// Overlay `OPENCLI_*` variables onto the config.
pub fn apply_env_overrides<F>(mut config: AssistantConfig, lookup: F) -> Result<AssistantConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(model) = get(ENV_MODEL) {
        config.model = Some(model);
    }
    if let Some(url) = get(ENV_BASE_URL) {
        config.base_url = Some(url);
    }
    if let Some(limit) = get(ENV_HISTORY_LIMIT) {
        let limit = limit
            .trim()
            .parse::<usize>()
            .with_context(|| format!("{ENV_HISTORY_LIMIT} must be a whole number, got '{limit}'"))?;
        config.history_limit = Some(limit);
    }
    if let Some(mode) = get(ENV_APPROVAL) {
        let mode = mode
            .parse::<ApprovalMode>()
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("Invalid {ENV_APPROVAL}"))?;
        config.approval = Some(mode);
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn substitutes_simple_var() {
        let v = json!({"apiKey": "${OPENAI_API_KEY}"});
        let result = resolve_env_vars_with(&v, &env(&[("OPENAI_API_KEY", "sk-abc123")])).unwrap();
        assert_eq!(result["apiKey"], "sk-abc123");
    }

    #[test]
    fn error_on_missing_var_names_path() {
        let v = json!({"logging": {"dir": "${LOG_HOME}/opencli"}});
        let err = resolve_env_vars_with(&v, &HashMap::new()).unwrap_err();
        assert_eq!(err.var_name, "LOG_HOME");
        assert_eq!(err.config_path, "logging.dir");
    }

    #[test]
    fn escaped_reference_stays_literal() {
        let v = json!({"model": "$${NOT_A_VAR}-x"});
        let result = resolve_env_vars_with(&v, &HashMap::new()).unwrap();
        assert_eq!(result["model"], "${NOT_A_VAR}-x");
    }

    #[test]
    fn non_string_values_pass_through() {
        let v = json!({"historyLimit": 4, "list": ["${A}", 2]});
        let result = resolve_env_vars_with(&v, &env(&[("A", "x")])).unwrap();
        assert_eq!(result["historyLimit"], 4);
        assert_eq!(result["list"][0], "x");
    }

    #[test]
    fn collects_referenced_vars() {
        let v = json!({"a": "${FOO}", "b": {"c": "${BAR} $${SKIP}"}, "d": "${FOO}"});
        assert_eq!(referenced_vars(&v), vec!["BAR".to_string(), "FOO".to_string()]);
    }

    #[test]
    fn overrides_apply() {
        let vars = env(&[
            (ENV_MODEL, "gpt-4o"),
            (ENV_HISTORY_LIMIT, "6"),
            (ENV_APPROVAL, "always"),
        ]);
        let cfg = apply_env_overrides(AssistantConfig::default(), |k| vars.get(k).cloned()).unwrap();
        assert_eq!(cfg.model.as_deref(), Some("gpt-4o"));
        assert_eq!(cfg.history_limit, Some(6));
        assert_eq!(cfg.approval, Some(ApprovalMode::Always));
        assert!(cfg.base_url.is_none());
    }

    #[test]
    fn bad_override_is_error() {
        let vars = env(&[(ENV_HISTORY_LIMIT, "ten")]);
        let err = apply_env_overrides(AssistantConfig::default(), |k| vars.get(k).cloned()).unwrap_err();
        assert!(err.to_string().contains(ENV_HISTORY_LIMIT));
    }
}
