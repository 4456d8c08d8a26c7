//! Textual process introspection sources.
//!
//! The lookup engine never spawns tools itself; it asks a [`ProcessSource`]
//! for raw text and parses it. [`ToolSource`] is the production source
//! backed by `ps` and `lsof`.

use super::tool_runner::{ToolError, ToolRunner};
use crate::config::ToolsConfig;
use prox_common::ProcessId;

/// Provider of raw process-listing text.
pub trait ProcessSource {
    /// All processes, one `PID TTY TIME ARGS...` row per line.
    fn list_all(&self) -> Result<String, ToolError>;

    /// A single `TTY COMMAND` row for `pid`.
    fn tty_and_command(&self, pid: ProcessId) -> Result<String, ToolError>;

    /// The full command line of `pid`.
    fn command_line(&self, pid: ProcessId) -> Result<String, ToolError>;

    /// The open-file table of `pid`, in lsof's default column layout.
    fn open_files(&self, pid: ProcessId) -> Result<String, ToolError>;

    /// Name of the tool behind a query, for error reporting.
    fn tool_name(&self, query: Query) -> &str;
}

/// The four queries a source answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    ListAll,
    TtyAndCommand,
    CommandLine,
    OpenFiles,
}

/// `ps`/`lsof`-backed source.
#[derive(Debug, Clone, Default)]
pub struct ToolSource {
    runner: ToolRunner,
    tools: ToolsConfig,
}

impl ToolSource {
    pub fn new(tools: ToolsConfig) -> Self {
        Self {
            runner: ToolRunner::new(tools.max_output_bytes),
            tools,
        }
    }

    fn ps(&self, args: &[&str]) -> Result<String, ToolError> {
        Ok(self.runner.run_checked(&self.tools.ps, args)?.stdout_str())
    }
}

impl ProcessSource for ToolSource {
    fn list_all(&self) -> Result<String, ToolError> {
        self.ps(&["-e", "-o", "pid=,tty=,time=,args="])
    }

    fn tty_and_command(&self, pid: ProcessId) -> Result<String, ToolError> {
        let pid = pid.to_string();
        self.ps(&["-o", "tty=,comm=", "-p", &pid])
    }

    fn command_line(&self, pid: ProcessId) -> Result<String, ToolError> {
        let pid = pid.to_string();
        self.ps(&["-o", "command=", "-p", &pid])
    }

    fn open_files(&self, pid: ProcessId) -> Result<String, ToolError> {
        let pid = pid.to_string();
        Ok(self
            .runner
            .run_checked(&self.tools.lsof, &["-p", &pid])?
            .stdout_str())
    }

    fn tool_name(&self, query: Query) -> &str {
        match query {
            Query::OpenFiles => &self.tools.lsof,
            _ => &self.tools.ps,
        }
    }
}
