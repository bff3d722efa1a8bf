//! Log Redaction Layer
//!
//! Scrubs API keys and bearer tokens from strings prior to logging.

use regex::Regex;
use std::sync::LazyLock;

static API_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(sk-[A-Za-z0-9_\-]{20,})|(Bearer\s+[a-zA-Z0-9\-\._~+/]+=*)").unwrap()
});

static KEY_ASSIGNMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)((?:api[_-]?key|token|secret|password)\s*[=:]\s*)([^\s,;]+)").unwrap()
});

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = API_KEY_RE.replace_all(input, "[REDACTED_TOKEN]");
    KEY_ASSIGNMENT_RE
        .replace_all(&redacted, "${1}[REDACTED]")
        .into_owned()
}
