//! prox core library
//!
//! Models and controls a running OS process:
//! - Parsing of `ps`/`lsof` text tables
//! - Process records and their platform handles
//! - Lookup by pid, by command-line fingerprint, or interactively by name
//! - Control: liveness checks, restarts, terminal re-injection
//! - Configuration, logging and CLI exit codes
//!
//! The binary entry point is in `main.rs`.

#[cfg(not(unix))]
compile_error!("prox-core supports unix-like systems only");

pub mod action;
pub mod collect;
pub mod config;
pub mod exit_codes;
pub mod handle;
pub mod logging;
pub mod record;

pub use handle::{HandleError, ProcessHandle};
pub use record::ProcessRecord;

// Re-export test utilities for integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_log;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
