//! Text-table parsing for ps and lsof output.
//!
//! Every function here is pure: it takes one line of whitespace-delimited
//! text and returns a typed row or a [`ParseError`]. Callers scanning
//! multi-line output decide whether a bad row is skipped or fatal.
//!
//! Row shapes:
//! - `ps -o tty=,comm=`: `TTY COMMAND...`
//! - `ps -o command=`: the full command line, split after the known command
//! - `ps -e -o pid=,tty=,time=,args=`: `PID TTY ...`
//! - `lsof -p PID`: `COMMAND PID USER FD TYPE DEVICE SIZE/OFF NODE NAME...`

use prox_common::{canonical_tty, ProcessId};
use thiserror::Error;

/// lsof column holding the descriptor kind.
pub const FD_KIND_FIELD: usize = 3;

/// First lsof column of the (possibly space-containing) path.
pub const FD_PATH_FIELD: usize = 8;

/// lsof descriptor kind for the current working directory.
pub const CWD_MARKER: &str = "cwd";

/// Errors for a single malformed row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("expected at least {expected} fields, got {actual}")]
    TooFewFields { expected: usize, actual: usize },

    #[error("command {command:?} does not occur in line")]
    CommandNotInLine { command: String },

    #[error("invalid pid field {0:?}")]
    InvalidPid(String),
}

impl From<ParseError> for prox_common::Error {
    fn from(err: ParseError) -> Self {
        prox_common::Error::MalformedOutput {
            tool: "ps/lsof".to_string(),
            line: err.to_string(),
        }
    }
}

/// Split a row on runs of Unicode whitespace.
pub fn fields(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

fn require_fields<'a>(line: &'a str, expected: usize) -> Result<Vec<&'a str>, ParseError> {
    let fields = fields(line);
    if fields.len() < expected {
        return Err(ParseError::TooFewFields {
            expected,
            actual: fields.len(),
        });
    }
    Ok(fields)
}

/// A `ps -o tty=,comm=` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtyCommand {
    /// Canonical tty (see [`canonical_tty`]).
    pub tty: String,
    /// Command name; multi-word names are rejoined with single spaces.
    pub command: String,
}

/// Parse a tty + command row: field 0 is the tty, the rest is the command.
pub fn parse_tty_command(line: &str) -> Result<TtyCommand, ParseError> {
    let fields = require_fields(line, 2)?;
    Ok(TtyCommand {
        tty: canonical_tty(fields[0]),
        command: fields[1..].join(" "),
    })
}

/// Extract the argument list from a full command line.
///
/// Everything strictly after the first occurrence of `command` is the
/// argument region, re-split on whitespace. If `command` also occurs earlier
/// in the line (for example inside its own directory path) the split happens
/// there instead.
pub fn parse_arguments(line: &str, command: &str) -> Result<Vec<String>, ParseError> {
    if command.is_empty() {
        return Err(ParseError::CommandNotInLine {
            command: String::new(),
        });
    }
    let start = line
        .find(command)
        .ok_or_else(|| ParseError::CommandNotInLine {
            command: command.to_string(),
        })?;
    let region = &line[start + command.len()..];
    Ok(region.split_whitespace().map(str::to_string).collect())
}

/// A row of the all-process listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRow<'a> {
    pub pid: ProcessId,
    /// Canonical tty of the row.
    pub tty: String,
    /// The raw row, untouched, for substring matching.
    pub line: &'a str,
}

/// Parse the leading pid field of a listing row.
pub fn parse_leading_pid(line: &str) -> Result<ProcessId, ParseError> {
    let first = line
        .split_whitespace()
        .next()
        .ok_or(ParseError::TooFewFields {
            expected: 1,
            actual: 0,
        })?;
    ProcessId::parse(first).ok_or_else(|| ParseError::InvalidPid(first.to_string()))
}

/// Parse an all-process listing row: `PID TTY ...`.
pub fn parse_listing_row(line: &str) -> Result<ListingRow<'_>, ParseError> {
    let fields = require_fields(line, 2)?;
    let pid = ProcessId::parse(fields[0])
        .ok_or_else(|| ParseError::InvalidPid(fields[0].to_string()))?;
    Ok(ListingRow {
        pid,
        tty: canonical_tty(fields[1]),
        line,
    })
}

/// A row of `lsof -p PID` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FdRow {
    /// Descriptor kind (`cwd`, `txt`, `3u`, ...).
    pub kind: String,
    /// Trailing path region; None when the row is too short to carry one.
    pub path: Option<String>,
}

impl FdRow {
    /// Whether this row describes the current working directory.
    pub fn is_cwd(&self) -> bool {
        self.kind == CWD_MARKER
    }
}

/// Parse an lsof row.
pub fn parse_fd_row(line: &str) -> Result<FdRow, ParseError> {
    let fields = require_fields(line, FD_KIND_FIELD + 1)?;
    let path = (fields.len() > FD_PATH_FIELD)
        .then(|| fields[FD_PATH_FIELD..].join(" ").trim().to_string());
    Ok(FdRow {
        kind: fields[FD_KIND_FIELD].to_string(),
        path,
    })
}

/// Parse an lsof row, returning the path only when it is the `cwd` row.
///
/// Non-cwd rows yield `Ok(None)`; a cwd row without a path is an error.
pub fn parse_cwd_row(line: &str) -> Result<Option<String>, ParseError> {
    let row = parse_fd_row(line)?;
    if !row.is_cwd() {
        return Ok(None);
    }
    match row.path {
        Some(path) => Ok(Some(path)),
        None => Err(ParseError::TooFewFields {
            expected: FD_PATH_FIELD + 1,
            actual: fields(line).len(),
        }),
    }
}
