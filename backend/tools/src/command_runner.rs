//! Command runner: spawn a program with verbatim arguments and capture its output.
//!
//! No shell is involved. `program` is resolved through the search path (or
//! used as a path) and each argument reaches the child unchanged.
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use opencli_core::OpenCliError;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::directory::DirectoryContext;

// ---------------------------------------------------------------------------
// Runner config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Timeout in seconds (0 = wait forever).
    pub timeout_secs: u64,
    /// Maximum bytes captured per stream.
    pub max_output_bytes: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            max_output_bytes: 200_000,
        }
    }
}

// ---------------------------------------------------------------------------
// Exec result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ExecResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub success: bool,
    pub timed_out: bool,
    pub truncated: bool,
}

impl ExecResult {
    /// Stdout when the process succeeded, stderr otherwise.
    ///
    /// A failed exit is only visible through which stream comes back.
    pub fn into_output(self) -> String {
        if self.success {
            self.stdout
        } else {
            self.stderr
        }
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct CommandRunner {
    config: RunnerConfig,
}

impl CommandRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run `program` in the context's directory and return the text the
    /// caller should see. Only a failure to start the process is an error.
    pub async fn run(
        &self,
        program: &str,
        arguments: &[String],
        directory: &DirectoryContext,
    ) -> Result<String, OpenCliError> {
        let cwd = directory.current();
        let result = self.execute(program, arguments, &cwd).await?;
        Ok(result.into_output())
    }

    /// Spawn, wait and capture both streams in full.
    pub async fn execute(
        &self,
        program: &str,
        arguments: &[String],
        cwd: &Path,
    ) -> Result<ExecResult, OpenCliError> {
        let resolved = resolve_program(program, cwd);
        info!(program = %program, args = ?arguments, cwd = %cwd.display(), "[CommandRunner] Running");

        let mut cmd = Command::new(&resolved);
        cmd.args(arguments)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|source| OpenCliError::Execution {
            program: program.to_string(),
            source,
        })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let waited = if self.config.timeout_secs > 0 {
            let timeout = Duration::from_secs(self.config.timeout_secs);
            match tokio::time::timeout(timeout, child.wait_with_output()).await {
                Ok(waited) => waited,
                Err(_) => {
                    warn!(program = %program, "[CommandRunner] Command timed out after {}s", self.config.timeout_secs);
                    return Ok(ExecResult {
                        stdout: String::new(),
                        stderr: format!("Command timed out after {}s", self.config.timeout_secs),
                        exit_code: None,
                        success: false,
                        timed_out: true,
                        truncated: false,
                    });
                }
            }
        } else {
            child.wait_with_output().await
        };

        let output = waited.map_err(|source| OpenCliError::Execution {
            program: program.to_string(),
            source,
        })?;

        let max = self.config.max_output_bytes;
        let truncated = output.stdout.len() > max || output.stderr.len() > max;
        let stdout = capture(&output.stdout, max);
        let stderr = capture(&output.stderr, max);

        debug!(
            program = %program,
            exit_code = ?output.status.code(),
            stdout_bytes = output.stdout.len(),
            stderr_bytes = output.stderr.len(),
            "[CommandRunner] Finished"
        );

        Ok(ExecResult {
            stdout,
            stderr,
            exit_code: output.status.code(),
            success: output.status.success(),
            timed_out: false,
            truncated,
        })
    }
}

/// Decode at most `max` bytes of a stream. A cut never splits a UTF-8
/// sequence and ends with a note saying how much was left out.
fn capture(bytes: &[u8], max: usize) -> String {
    if bytes.len() <= max {
        return String::from_utf8_lossy(bytes).into_owned();
    }

    // Back off continuation bytes (at most three) so the cut lands on a
    // character boundary.
    let mut end = max;
    while end > 0 && max - end < 3 && is_continuation(bytes[end]) {
        end -= 1;
    }

    let omitted = bytes.len() - end;
    format!(
        "{}\n[output truncated: {omitted} bytes omitted]",
        String::from_utf8_lossy(&bytes[..end])
    )
}

fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

/// Relative paths with a separator are taken relative to `cwd`; bare names
/// go through the search path.
fn resolve_program(program: &str, cwd: &Path) -> PathBuf {
    let path = Path::new(program);
    let has_separator = program.contains('/') || program.contains(std::path::MAIN_SEPARATOR);
    if path.is_relative() && has_separator {
        cwd.join(path)
    } else {
        path.to_path_buf()
    }
}
