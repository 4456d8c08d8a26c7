//! Error types for prox.
//!
//! Every failure the core can report falls into one of four categories
//! (plus configuration problems of the binary):
//! - user input (empty command, bad selection number)
//! - not found (no process for a pid or fingerprint)
//! - external tool (`ps`/`lsof` failed to run or printed garbage)
//! - OS operation (signal, spawn, wait, open, chdir)
//!
//! Nothing is retried. Callers decide whether an error is fatal.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for prox operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Invalid user input.
    Input,
    /// No process matched the request.
    NotFound,
    /// An external introspection tool failed.
    Tool,
    /// A platform call failed.
    Os,
    /// Configuration file problems.
    Config,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Input => write!(f, "input"),
            ErrorCategory::NotFound => write!(f, "not_found"),
            ErrorCategory::Tool => write!(f, "tool"),
            ErrorCategory::Os => write!(f, "os"),
            ErrorCategory::Config => write!(f, "config"),
        }
    }
}

/// Unified error type for prox.
#[derive(Error, Debug)]
pub enum Error {
    // Input errors (10-19)
    #[error("process command is empty")]
    CommandEmpty,

    #[error("please enter a valid number: {0}")]
    InvalidNumber(String),

    // Not-found errors (20-29)
    #[error("process {pid} not found")]
    ProcessNotFound { pid: u32 },

    #[error("no process matches {fingerprint:?}")]
    NoMatchingProcess { fingerprint: String },

    // Tool errors (30-39)
    #[error("{tool} failed: {reason}")]
    ToolFailed { tool: String, reason: String },

    #[error("malformed {tool} output: {line:?}")]
    MalformedOutput { tool: String, line: String },

    // OS errors (40-49)
    #[error("permission denied accessing process {pid}")]
    PermissionDenied { pid: u32 },

    #[error("process is not in a tty")]
    NotInTty,

    #[error("process {pid} already released")]
    Released { pid: u32 },

    #[error("process working directory is unresolved")]
    CwdUnresolved,

    #[error("OS error: {0}")]
    Os(#[from] std::io::Error),

    // Config errors (50-59)
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns the stable error code for this error type.
    ///
    /// - 10-19: input errors
    /// - 20-29: not-found errors
    /// - 30-39: tool errors
    /// - 40-49: OS errors
    /// - 50-59: configuration errors
    pub fn code(&self) -> u32 {
        match self {
            Error::CommandEmpty => 10,
            Error::InvalidNumber(_) => 11,
            Error::ProcessNotFound { .. } => 20,
            Error::NoMatchingProcess { .. } => 21,
            Error::ToolFailed { .. } => 30,
            Error::MalformedOutput { .. } => 31,
            Error::PermissionDenied { .. } => 40,
            Error::NotInTty => 41,
            Error::Released { .. } => 42,
            Error::CwdUnresolved => 43,
            Error::Os(_) => 44,
            Error::Config(_) => 50,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::CommandEmpty | Error::InvalidNumber(_) => ErrorCategory::Input,

            Error::ProcessNotFound { .. } | Error::NoMatchingProcess { .. } => {
                ErrorCategory::NotFound
            }

            Error::ToolFailed { .. } | Error::MalformedOutput { .. } => ErrorCategory::Tool,

            Error::PermissionDenied { .. }
            | Error::NotInTty
            | Error::Released { .. }
            | Error::CwdUnresolved
            | Error::Os(_) => ErrorCategory::Os,

            Error::Config(_) => ErrorCategory::Config,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::CommandEmpty => "Provide the command name to search for",
            Error::InvalidNumber(_) => "Enter one of the numbers printed in the list",
            Error::ProcessNotFound { .. } => "Check that the process is still running",
            Error::NoMatchingProcess { .. } => {
                "Look the process up by pid, or check its command line and tty"
            }
            Error::ToolFailed { .. } => "Ensure ps and lsof are installed and on PATH",
            Error::MalformedOutput { .. } => "Check the configured ps/lsof binaries",
            Error::PermissionDenied { .. } => "Run as the process owner or with sudo",
            Error::NotInTty => "The process has no controlling terminal",
            Error::Released { .. } => "Look the process up again to get a fresh handle",
            Error::CwdUnresolved => "lsof did not report a working directory for the process",
            Error::Os(_) => "Check permissions and that the target still exists",
            Error::Config(_) => "Fix or remove the prox config file",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(Error::CommandEmpty.category(), ErrorCategory::Input);
        assert_eq!(
            Error::InvalidNumber("-1".to_string()).category(),
            ErrorCategory::Input
        );
        assert_eq!(
            Error::ProcessNotFound { pid: 1 }.category(),
            ErrorCategory::NotFound
        );
        assert_eq!(
            Error::MalformedOutput {
                tool: "ps".to_string(),
                line: "x".to_string()
            }
            .category(),
            ErrorCategory::Tool
        );
        assert_eq!(Error::NotInTty.category(), ErrorCategory::Os);
        assert_eq!(
            Error::Config("bad".to_string()).category(),
            ErrorCategory::Config
        );
    }

    #[test]
    fn test_error_codes_are_grouped() {
        assert_eq!(Error::CommandEmpty.code() / 10, 1);
        assert_eq!(Error::NoMatchingProcess { fingerprint: "a".into() }.code() / 10, 2);
        assert_eq!(
            Error::ToolFailed {
                tool: "lsof".into(),
                reason: "missing".into()
            }
            .code()
                / 10,
            3
        );
        assert_eq!(Error::Released { pid: 9 }.code() / 10, 4);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(Error::CommandEmpty.to_string(), "process command is empty");
        assert_eq!(Error::NotInTty.to_string(), "process is not in a tty");
        assert_eq!(
            Error::ProcessNotFound { pid: 42 }.to_string(),
            "process 42 not found"
        );
    }

    #[test]
    fn test_io_error_converts() {
        let err: Error = std::io::Error::from(std::io::ErrorKind::NotFound).into();
        assert_eq!(err.category(), ErrorCategory::Os);
        assert!(!err.remediation().is_empty());
    }

    #[test]
    fn test_category_display() {
        assert_eq!(ErrorCategory::NotFound.to_string(), "not_found");
        assert_eq!(ErrorCategory::Tool.to_string(), "tool");
    }
}
