//! Process lookup: reconstruct a [`ProcessRecord`] from tool output.
//!
//! Three entry points:
//! - [`Lookup::resolve_by_pid`]: tty and command from `ps`, arguments from
//!   the full command line, working directory from the `cwd` row of `lsof`.
//! - [`Lookup::resolve_by_fingerprint`] / [`Lookup::refresh`]: find the pid
//!   of a process known only by command, arguments and tty.
//! - [`Lookup::select_by_name`]: list candidate rows, let the user pick one.
//!
//! Fingerprint matching is a plain substring test over listing rows and the
//! last matching row wins. Two processes with identical command lines on
//! the same terminal are indistinguishable.

use super::parse::{self, ParseError};
use super::source::{ProcessSource, Query};
use super::tool_runner::ToolError;
use crate::handle::{HandleError, ProcessHandle};
use crate::record::ProcessRecord;
use prox_common::{canonical_tty, ProcessId};
use std::io::{BufRead, Write};
use thiserror::Error;
use tracing::{debug, info, instrument};

/// Prompt printed after the candidate list of [`Lookup::select_by_name`].
pub const SELECT_PROMPT: &str =
    "Which number above represents the correct process (enter the number):";

/// Errors from process lookup.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("process command is empty")]
    CommandEmpty,

    #[error("please enter a valid number: {0:?}")]
    InvalidNumber(String),

    #[error("no process matches {fingerprint:?}")]
    NoMatch { fingerprint: String },

    #[error("no process name contains {0:?}")]
    NoNameMatch(String),

    #[error(transparent)]
    Handle(#[from] HandleError),

    #[error("{tool}: {source}")]
    Tool {
        tool: String,
        #[source]
        source: ToolError,
    },

    #[error("malformed {tool} output {line:?}: {source}")]
    Malformed {
        tool: String,
        line: String,
        #[source]
        source: ParseError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LookupError> for prox_common::Error {
    fn from(err: LookupError) -> Self {
        use prox_common::Error;
        match err {
            LookupError::CommandEmpty => Error::CommandEmpty,
            LookupError::InvalidNumber(input) => Error::InvalidNumber(input),
            LookupError::NoMatch { fingerprint } => Error::NoMatchingProcess { fingerprint },
            LookupError::NoNameMatch(name) => Error::NoMatchingProcess { fingerprint: name },
            LookupError::Handle(e) => e.into(),
            LookupError::Tool { tool, source } => Error::ToolFailed {
                tool,
                reason: source.to_string(),
            },
            LookupError::Malformed { tool, line, .. } => Error::MalformedOutput { tool, line },
            LookupError::Io(e) => Error::Os(e),
        }
    }
}

/// A listing row selected by fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintMatch {
    pub pid: ProcessId,
    /// Canonical tty of the matching row.
    pub tty: String,
}

/// Scan an all-process listing for the last row matching a fingerprint.
///
/// A row matches when it contains `full_command` and either contains `tty`
/// verbatim or has a canonical tty column equal to `tty`. An empty `tty`
/// matches any row. Only rows containing `full_command` are parsed, so a
/// malformed unrelated row is ignored. The row of `exclude` never matches.
pub fn match_fingerprint(
    listing: &str,
    full_command: &str,
    tty: &str,
    exclude: Option<ProcessId>,
) -> Result<Option<FingerprintMatch>, (String, ParseError)> {
    let mut found = None;
    for line in listing.lines().filter(|line| line.contains(full_command)) {
        let row = parse::parse_listing_row(line).map_err(|e| (line.to_string(), e))?;
        if !(tty.is_empty() || row.line.contains(tty) || row.tty == tty) {
            continue;
        }
        if Some(row.pid) == exclude {
            debug!(pid = row.pid.0, "skipping own listing row");
            continue;
        }
        debug!(pid = row.pid.0, row = row.line, "fingerprint row matched");
        found = Some(FingerprintMatch {
            pid: row.pid,
            tty: row.tty,
        });
    }
    Ok(found)
}

/// Listing rows whose lowercased text contains the lowercased `name`.
pub fn filter_by_name<'a>(listing: &'a str, name: &str) -> Vec<&'a str> {
    let needle = name.to_lowercase();
    listing
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter(|line| line.to_lowercase().contains(&needle))
        .collect()
}

/// Working directory from lsof output: the path of the last `cwd` row.
///
/// Rows that fail to parse are skipped.
pub fn cwd_from_open_files(output: &str) -> Option<String> {
    let mut cwd = None;
    for line in output.lines() {
        match parse::parse_cwd_row(line) {
            Ok(Some(path)) => cwd = Some(path),
            Ok(None) => {}
            Err(e) => debug!(row = line, error = %e, "skipping lsof row"),
        }
    }
    cwd
}

fn first_line(text: &str) -> &str {
    text.lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or_default()
}

/// Lookup engine over a [`ProcessSource`].
///
/// The listing always contains the calling process, and with full command
/// lines its row holds whatever fingerprint or name it was asked for. That
/// row is excluded from fingerprint matches and name candidates.
#[derive(Debug, Clone)]
pub struct Lookup<S> {
    source: S,
    excluded: Option<ProcessId>,
}

impl<S: ProcessSource> Lookup<S> {
    /// Lookup that never resolves the current process from a listing.
    pub fn new(source: S) -> Self {
        Self {
            source,
            excluded: Some(ProcessId(std::process::id())),
        }
    }

    /// Replace the pid whose listing row is ignored; `None` ignores nothing.
    pub fn with_excluded_pid(mut self, pid: Option<ProcessId>) -> Self {
        self.excluded = pid;
        self
    }

    fn is_excluded(&self, row: &str) -> bool {
        match (self.excluded, parse::parse_leading_pid(row)) {
            (Some(excluded), Ok(pid)) => pid == excluded,
            _ => false,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn tool_error(&self, query: Query) -> impl FnOnce(ToolError) -> LookupError + '_ {
        move |source| LookupError::Tool {
            tool: self.source.tool_name(query).to_string(),
            source,
        }
    }

    fn malformed(&self, query: Query, line: &str, source: ParseError) -> LookupError {
        LookupError::Malformed {
            tool: self.source.tool_name(query).to_string(),
            line: line.to_string(),
            source,
        }
    }

    /// Resolve a process from its pid.
    #[instrument(skip(self), fields(pid = pid.0))]
    pub fn resolve_by_pid(&self, pid: ProcessId) -> Result<ProcessRecord, LookupError> {
        let handle = ProcessHandle::attach(pid)?;

        let text = self
            .source
            .tty_and_command(pid)
            .map_err(self.tool_error(Query::TtyAndCommand))?;
        let line = first_line(&text);
        let row = parse::parse_tty_command(line)
            .map_err(|e| self.malformed(Query::TtyAndCommand, line, e))?;

        let text = self
            .source
            .command_line(pid)
            .map_err(self.tool_error(Query::CommandLine))?;
        let line = first_line(&text);
        let args = parse::parse_arguments(line, &row.command)
            .map_err(|e| self.malformed(Query::CommandLine, line, e))?;

        let cwd = self.working_directory(pid)?;

        info!(pid = pid.0, cmd = %row.command, tty = %row.tty, "resolved process");
        Ok(ProcessRecord::new(handle, row.tty, cwd, row.command, args))
    }

    fn working_directory(&self, pid: ProcessId) -> Result<String, LookupError> {
        let text = self
            .source
            .open_files(pid)
            .map_err(self.tool_error(Query::OpenFiles))?;
        Ok(cwd_from_open_files(&text).unwrap_or_else(|| {
            debug!(pid = pid.0, "no cwd row in lsof output");
            String::new()
        }))
    }

    /// Find the pid of the process with the given fingerprint.
    ///
    /// Fails with [`LookupError::CommandEmpty`] before querying anything
    /// when `cmd` is empty.
    #[instrument(skip(self, args))]
    pub fn find_pid(
        &self,
        cmd: &str,
        args: &[String],
        tty: &str,
    ) -> Result<FingerprintMatch, LookupError> {
        if cmd.is_empty() {
            return Err(LookupError::CommandEmpty);
        }
        let fingerprint = if args.is_empty() {
            cmd.to_string()
        } else {
            format!("{} {}", cmd, args.join(" "))
        };

        let listing = self
            .source
            .list_all()
            .map_err(self.tool_error(Query::ListAll))?;
        match match_fingerprint(&listing, &fingerprint, tty, self.excluded) {
            Ok(Some(found)) => Ok(found),
            Ok(None) => Err(LookupError::NoMatch { fingerprint }),
            Err((line, e)) => Err(self.malformed(Query::ListAll, &line, e)),
        }
    }

    /// Build a record for a process known by command, arguments and tty.
    ///
    /// When `tty` is empty the tty of the matching row is recorded.
    pub fn resolve_by_fingerprint(
        &self,
        cmd: &str,
        args: &[String],
        tty: &str,
    ) -> Result<ProcessRecord, LookupError> {
        let found = self.find_pid(cmd, args, tty)?;
        let handle = ProcessHandle::attach(found.pid)?;
        let cwd = self.working_directory(found.pid)?;
        let tty = if tty.is_empty() { found.tty } else { tty.to_string() };
        Ok(ProcessRecord::new(handle, tty, cwd, cmd, args.to_vec()))
    }

    /// Re-find `record` by its fingerprint and install the new pid and handle.
    ///
    /// On failure the record is left untouched.
    pub fn refresh(&self, record: &mut ProcessRecord) -> Result<(), LookupError> {
        let found = self.find_pid(record.cmd(), record.args(), record.tty())?;
        let handle = ProcessHandle::attach(found.pid)?;
        debug!(old = record.pid().0, new = found.pid.0, "refreshed process identity");
        record.replace_handle(handle);
        Ok(())
    }

    /// Let the user choose among processes whose listing row contains `name`.
    ///
    /// Candidates are written to `output` as `"{index}: {row}"`, followed by
    /// [`SELECT_PROMPT`]. One line is read from `input`; anything that is not
    /// a valid index fails with [`LookupError::InvalidNumber`] before any pid
    /// is resolved.
    pub fn select_by_name<R: BufRead, W: Write>(
        &self,
        name: &str,
        mut input: R,
        mut output: W,
    ) -> Result<ProcessRecord, LookupError> {
        let listing = self
            .source
            .list_all()
            .map_err(self.tool_error(Query::ListAll))?;
        let candidates: Vec<&str> = filter_by_name(&listing, name)
            .into_iter()
            .filter(|row| !self.is_excluded(row))
            .collect();
        if candidates.is_empty() {
            return Err(LookupError::NoNameMatch(name.to_string()));
        }

        for (i, row) in candidates.iter().enumerate() {
            writeln!(output, "{}: {}", i, row.trim())?;
        }
        writeln!(output)?;
        writeln!(output, "{}", SELECT_PROMPT)?;
        output.flush()?;

        let mut answer = String::new();
        input.read_line(&mut answer)?;
        let answer = answer.trim();
        let index = answer
            .parse::<i64>()
            .ok()
            .and_then(|n| usize::try_from(n).ok())
            .filter(|&n| n < candidates.len())
            .ok_or_else(|| LookupError::InvalidNumber(answer.to_string()))?;

        let row = candidates[index];
        let pid =
            parse::parse_leading_pid(row).map_err(|e| self.malformed(Query::ListAll, row, e))?;
        debug!(index, pid = pid.0, "process selected");
        self.resolve_by_pid(pid)
    }
}
