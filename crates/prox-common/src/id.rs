//! Process identity types.
//!
//! A process is addressed by its pid; its controlling terminal is carried as
//! the device name reported by the listing tool, or the [`NO_TTY`] sentinel.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel tty value for a process without a controlling terminal.
pub const NO_TTY: &str = "??";

/// Process ID wrapper with display formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(pub u32);

impl ProcessId {
    /// Parse a pid field as printed by listing tools.
    ///
    /// Zero and negative values are rejected: pid 0 addresses the caller's
    /// own process group when handed to `kill(2)`.
    pub fn parse(field: &str) -> Option<Self> {
        match field.trim().parse::<u32>() {
            Ok(0) | Err(_) => None,
            Ok(pid) => Some(ProcessId(pid)),
        }
    }

    /// The pid as the signed type used by POSIX calls.
    pub fn as_raw(self) -> Option<i32> {
        i32::try_from(self.0).ok().filter(|pid| *pid > 0)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ProcessId {
    fn from(pid: u32) -> Self {
        ProcessId(pid)
    }
}

/// Whether a raw tty column value means "no controlling terminal".
///
/// BSD ps prints `??`, procps prints `?`, and some tools print `-`.
pub fn is_no_tty_marker(raw: &str) -> bool {
    matches!(raw.trim(), "??" | "?" | "-")
}

/// Canonicalize a raw tty column value.
///
/// Every "no terminal" marker becomes [`NO_TTY`]; device names pass through.
pub fn canonical_tty(raw: &str) -> String {
    let raw = raw.trim();
    if is_no_tty_marker(raw) {
        NO_TTY.to_string()
    } else {
        raw.to_string()
    }
}
