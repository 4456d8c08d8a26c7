//! Exit codes for the prox CLI.
//!
//! Exit code ranges:
//! - 0-1: Operational outcomes (`check` reports "not running" as 1)
//! - 10-19: User/environment errors (recoverable by user action)
//! - 20-29: Internal and OS errors

use prox_common::{Error, ErrorCategory};

/// Exit codes for prox operations. These are a stable contract for scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Ok = 0,

    /// `check`: the process is not running.
    NotRunning = 1,

    /// Invalid arguments or input (bad number, empty command, no tty, config).
    InputError = 10,

    /// An external tool is missing or failed.
    ToolError = 11,

    /// Permission denied.
    PermissionError = 12,

    /// No process matched.
    NotFound = 13,

    /// OS call failed or internal error.
    InternalError = 20,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Check if this exit code is a user/environment error (codes 10-19).
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&self.as_i32())
    }

    /// Check if this exit code indicates any error.
    pub fn is_error(self) -> bool {
        self.as_i32() >= 10
    }

    /// Get the code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Ok => "OK",
            ExitCode::NotRunning => "NOT_RUNNING",
            ExitCode::InputError => "ERR_INPUT",
            ExitCode::ToolError => "ERR_TOOL",
            ExitCode::PermissionError => "ERR_PERMISSION",
            ExitCode::NotFound => "ERR_NOT_FOUND",
            ExitCode::InternalError => "ERR_INTERNAL",
        }
    }

    /// Exit code for a failed operation.
    pub fn from_error(err: &Error) -> Self {
        match err {
            Error::PermissionDenied { .. } => ExitCode::PermissionError,
            Error::NotInTty => ExitCode::InputError,
            _ => match err.category() {
                ErrorCategory::Input | ErrorCategory::Config => ExitCode::InputError,
                ErrorCategory::NotFound => ExitCode::NotFound,
                ErrorCategory::Tool => ExitCode::ToolError,
                ErrorCategory::Os => ExitCode::InternalError,
            },
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
