//! Structured Logger
//!
//! Wraps `tracing` with a stderr layer and a daily-rolling NDJSON file layer.
//! Stdout is reserved for the conversation, so diagnostics never go there.

use std::io::IsTerminal;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// File name prefix of the rolling log, e.g. `opencli.log.2026-10-16`.
pub const LOG_FILE_PREFIX: &str = "opencli.log";

/// Initialize the global structured logger.
///
/// `RUST_LOG` takes precedence over `level`. Calling this twice is harmless;
/// the second subscriber is ignored.
pub fn init_logger<P: AsRef<Path>>(log_dir: P, level: &str) -> Result<()> {
    let log_dir = log_dir.as_ref();
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .build(log_dir)
        .with_context(|| format!("Failed to open log file in: {}", log_dir.display()))?;

    let file_layer = fmt::layer()
        .json()
        .with_writer(file_appender)
        .with_ansi(false);

    let console_layer = fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal());

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    Ok(())
}
