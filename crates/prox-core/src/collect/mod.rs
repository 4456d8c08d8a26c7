//! Process discovery.
//!
//! This module reconstructs process identities from textual tool output:
//! - Row parsing for `ps` and `lsof` output
//! - The [`ProcessSource`] seam and its `ps`/`lsof` implementation
//! - The lookup engine (by pid, by fingerprint, by name)
//! - Tool runner for safe external command execution

pub mod lookup;
pub mod parse;
pub mod source;
pub mod tool_runner;

pub use lookup::{
    cwd_from_open_files, filter_by_name, match_fingerprint, FingerprintMatch, Lookup,
    LookupError, SELECT_PROMPT,
};
pub use parse::ParseError;
pub use source::{ProcessSource, Query, ToolSource};
pub use tool_runner::{ToolError, ToolOutput, ToolRunner, DEFAULT_MAX_OUTPUT_BYTES};
