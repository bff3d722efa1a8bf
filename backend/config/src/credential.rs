//! API key acquisition: config, then environment, then one interactive prompt.
//!
//! The prompt itself belongs to the caller's console; this module only decides
//! whether one is needed and what to make of the answer.

use opencli_core::OpenCliError;
use tracing::info;

use crate::schema::AssistantConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Config,
    Environment,
    Prompt,
}

#[derive(Debug, Clone)]
pub struct Credential {
    pub api_key: String,
    pub source: CredentialSource,
}

/// Key from the config file or the configured environment variable, if any.
pub fn find_api_key<L>(config: &AssistantConfig, lookup: L) -> Option<Credential>
where
    L: Fn(&str) -> Option<String>,
{
    let non_empty = |k: String| {
        let k = k.trim().to_string();
        (!k.is_empty()).then_some(k)
    };

    if let Some(key) = config.api_key.clone().and_then(non_empty) {
        return Some(Credential {
            api_key: key,
            source: CredentialSource::Config,
        });
    }

    lookup(config.api_key_env())
        .and_then(non_empty)
        .map(|key| Credential {
            api_key: key,
            source: CredentialSource::Environment,
        })
}

/// Turn what the user typed at the key prompt into a credential.
/// `None` is end of input.
pub fn prompted_api_key(typed: Option<String>) -> Result<Credential, OpenCliError> {
    match typed.map(|k| k.trim().to_string()) {
        Some(key) if !key.is_empty() => {
            info!("API key provided interactively");
            Ok(Credential {
                api_key: key,
                source: CredentialSource::Prompt,
            })
        }
        _ => Err(OpenCliError::Credential("No key provided. Exiting.".to_string())),
    }
}

/// Make a prompted key visible to the rest of this process only.
///
/// Must run before any other thread reads the environment.
pub fn persist_for_session(var: &str, credential: &Credential) {
    if credential.source == CredentialSource::Prompt {
        std::env::set_var(var, &credential.api_key);
    }
}
