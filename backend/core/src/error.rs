use thiserror::Error;

/// Top-level error type for the OpenCLI assistant.
#[derive(Debug, Error)]
pub enum OpenCliError {
    #[error("no API key available: {0}")]
    Credential(String),

    #[error("failed to start '{program}': {source}")]
    Execution {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot change directory to '{path}': {source}")]
    Directory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("LLM provider error ({provider}): {message}")]
    Backend { provider: String, message: String },

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("invalid arguments for tool '{tool}': {message}")]
    InvalidToolArguments { tool: String, message: String },

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
