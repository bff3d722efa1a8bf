//! `opencli-config`: OpenCLI assistant configuration management.
//!
//! Provides:
//! - Typed config schema with defaults
//! - YAML loading from the config directory
//! - `${ENV_VAR}` substitution and `OPENCLI_*` overrides
//! - Validation, redaction for display, and API key acquisition

pub mod credential;
pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

// Re-export most-used types at crate root.
pub use credential::{find_api_key, persist_for_session, prompted_api_key, Credential, CredentialSource};
pub use defaults::apply_all_defaults;
pub use env::{apply_env_overrides, referenced_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_config};
pub use redact::{redact, redacted_config};
pub use schema::{AssistantConfig, LoggingConfig};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Load a config file, substitute env vars, apply `OPENCLI_*` overrides and
/// defaults. Validation is left to the caller so it can layer CLI flags first.
pub async fn load_and_prepare(path: &Path) -> Result<AssistantConfig> {
    let raw_config = load_config(path).await?;
    prepare(raw_config, |name| std::env::var(name).ok())
}

/// The substitution/override/defaults pipeline, with an injectable environment.
pub fn prepare<F>(raw_config: AssistantConfig, lookup: F) -> Result<AssistantConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let value: Value =
        serde_json::to_value(&raw_config).context("Failed to serialize config for processing")?;

    let env_map: HashMap<String, String> = referenced_vars(&value)
        .into_iter()
        .filter_map(|name| lookup(&name).map(|v| (name, v)))
        .collect();
    let value = resolve_env_vars_with(&value, &env_map)
        .context("Failed to resolve env vars in config")?;

    let config: AssistantConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;

    let config = apply_env_overrides(config, &lookup)?;
    Ok(apply_all_defaults(config))
}
