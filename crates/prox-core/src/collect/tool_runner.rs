//! Runner for the external introspection tools (ps, lsof).
//!
//! Tools run to completion: there is no timeout and no retry. The runner
//! only guards against obviously unsafe command strings, caps captured
//! stdout, and turns spawn failures and exit statuses into [`ToolError`]s.
//!
//! # Example
//!
//! ```ignore
//! use prox_core::collect::ToolRunner;
//!
//! let runner = ToolRunner::default();
//! let output = runner.run_tool("ps", &["-o", "tty=,comm=", "-p", "1"])?;
//! println!("{}", output.stdout_str());
//! ```

use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Default maximum captured stdout size in bytes (16MB).
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 16 * 1024 * 1024;

/// Errors that can occur during tool execution.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("command failed to spawn: {0}")]
    SpawnFailed(String),

    #[error("{command} exited with status {code}: {stderr}")]
    NonZeroExit {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("{command} killed by signal {signal}")]
    KilledBySignal { command: String, signal: i32 },

    #[error("output of {command} exceeded {limit} bytes")]
    OutputTooLarge { command: String, limit: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid command path: {0}")]
    InvalidPath(String),
}

impl ToolError {
    /// The command this error concerns, when known.
    pub fn command(&self) -> Option<&str> {
        match self {
            ToolError::CommandNotFound(cmd)
            | ToolError::NonZeroExit { command: cmd, .. }
            | ToolError::KilledBySignal { command: cmd, .. }
            | ToolError::OutputTooLarge { command: cmd, .. } => Some(cmd.as_str()),
            _ => None,
        }
    }
}

impl From<ToolError> for prox_common::Error {
    fn from(err: ToolError) -> Self {
        prox_common::Error::ToolFailed {
            tool: err.command().unwrap_or("external tool").to_string(),
            reason: err.to_string(),
        }
    }
}

/// Captured output of one tool run.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,

    /// Exit code (None when killed by a signal).
    pub exit_code: Option<i32>,

    /// Terminating signal, if any.
    pub signal: Option<i32>,
}

impl ToolOutput {
    /// Get stdout as string (lossy UTF-8 conversion).
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Check if the command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Synchronous tool runner.
#[derive(Debug, Clone)]
pub struct ToolRunner {
    max_output_bytes: usize,
}

impl Default for ToolRunner {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_OUTPUT_BYTES)
    }
}

impl ToolRunner {
    /// Create a runner that rejects stdout larger than `max_output_bytes`.
    pub fn new(max_output_bytes: usize) -> Self {
        Self { max_output_bytes }
    }

    /// Run a tool and capture its output, whatever its exit status.
    #[instrument(skip(self), fields(cmd = %cmd))]
    pub fn run_tool(&self, cmd: &str, args: &[&str]) -> Result<ToolOutput, ToolError> {
        validate_command(cmd)?;

        debug!(command = %cmd, args = ?args, "running tool");
        let start = Instant::now();

        let output = Command::new(cmd)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ToolError::CommandNotFound(cmd.to_string()),
                _ => ToolError::SpawnFailed(format!("{cmd}: {e}")),
            })?;

        let duration = start.elapsed();
        if output.stdout.len() > self.max_output_bytes {
            return Err(ToolError::OutputTooLarge {
                command: cmd.to_string(),
                limit: self.max_output_bytes,
            });
        }

        info!(
            command = %cmd,
            duration_ms = duration.as_millis() as u64,
            exit_code = ?output.status.code(),
            "tool execution complete"
        );

        Ok(ToolOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.status.code(),
            signal: output.status.signal(),
        })
    }

    /// Run a tool and require usable output.
    ///
    /// A non-zero exit with empty stdout is a failure. A non-zero exit that
    /// still produced output (lsof does this when some descriptors are
    /// unreadable) is logged and the output is returned.
    pub fn run_checked(&self, cmd: &str, args: &[&str]) -> Result<ToolOutput, ToolError> {
        let output = self.run_tool(cmd, args)?;
        if output.success() {
            return Ok(output);
        }

        let stdout_empty = output.stdout.iter().all(u8::is_ascii_whitespace);
        match output.exit_code {
            Some(code) if stdout_empty => Err(ToolError::NonZeroExit {
                command: cmd.to_string(),
                code,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
            None => Err(ToolError::KilledBySignal {
                command: cmd.to_string(),
                signal: output.signal.unwrap_or_default(),
            }),
            Some(code) => {
                warn!(command = %cmd, code, "tool exited non-zero; using partial output");
                Ok(output)
            }
        }
    }
}

/// Reject empty commands, shell metacharacters and missing absolute paths.
fn validate_command(cmd: &str) -> Result<(), ToolError> {
    if cmd.trim().is_empty() {
        return Err(ToolError::InvalidPath("empty command".to_string()));
    }

    if cmd.contains(['|', '&', ';', '$', '`', '\n', '\r']) {
        return Err(ToolError::InvalidPath(format!(
            "command contains shell metacharacters: {}",
            cmd
        )));
    }

    if cmd.starts_with('/') && !Path::new(cmd).exists() {
        return Err(ToolError::CommandNotFound(cmd.to_string()));
    }

    Ok(())
}
