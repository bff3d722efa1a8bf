//! Config redaction: produce safe-to-print config snapshots by masking secrets.

use serde_json::Value;

use crate::schema::AssistantConfig;

static SENSITIVE_KEYS: &[&str] = &["apiKey", "api_key", "token", "secret", "password"];

/// Redact a config JSON value, masking every sensitive field.
pub fn redact(value: &Value) -> Value {
    redact_recursive(value, "")
}

/// Serialize the config and redact it in one step.
pub fn redacted_config(config: &AssistantConfig) -> anyhow::Result<Value> {
    Ok(redact(&serde_json::to_value(config)?))
}

fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

fn mask(s: &str) -> String {
    // Keep a short prefix so users can tell which key is configured.
    let prefix: String = s.chars().take(3).collect();
    if s.chars().count() > 8 {
        format!("{prefix}***")
    } else {
        "***".to_string()
    }
}

fn redact_recursive(value: &Value, key: &str) -> Value {
    match value {
        Value::String(s) if is_sensitive_key(key) && !s.is_empty() => Value::String(mask(s)),
        Value::Array(arr) => Value::Array(arr.iter().map(|v| redact_recursive(v, key)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), redact_recursive(v, k)))
                .collect(),
        ),
        other => other.clone(),
    }
}
