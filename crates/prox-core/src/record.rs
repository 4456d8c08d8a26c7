//! The in-memory identity of a process.
//!
//! A [`ProcessRecord`] is produced by the lookup engine and consumed by the
//! control engine. It owns a [`ProcessHandle`] and forwards signal, wait and
//! release to it; the handle itself is never exposed.
//!
//! Killing or releasing the process does not erase the identity fields: a
//! record stays readable as a snapshot of what was resolved.

use crate::handle::{HandleError, ProcessHandle};
use prox_common::{ProcessId, NO_TTY};
use serde::Serialize;
use std::fmt;
use std::process::ExitStatus;

/// A fully resolved process.
#[derive(Debug, Serialize)]
pub struct ProcessRecord {
    pid: ProcessId,
    tty: String,
    cwd: String,
    cmd: String,
    args: Vec<String>,
    #[serde(skip)]
    handle: ProcessHandle,
}

impl ProcessRecord {
    /// Assemble a record around an already attached handle.
    ///
    /// An empty `tty` is stored as the [`NO_TTY`] sentinel.
    pub fn new(
        handle: ProcessHandle,
        tty: impl Into<String>,
        cwd: impl Into<String>,
        cmd: impl Into<String>,
        args: Vec<String>,
    ) -> Self {
        let tty = tty.into();
        Self {
            pid: handle.pid(),
            tty: if tty.trim().is_empty() {
                NO_TTY.to_string()
            } else {
                tty
            },
            cwd: cwd.into(),
            cmd: cmd.into(),
            args,
            handle,
        }
    }

    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    /// Controlling terminal name, or [`NO_TTY`].
    pub fn tty(&self) -> &str {
        &self.tty
    }

    /// Working directory; empty when lsof did not report one.
    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The command followed by its arguments, separated by single spaces.
    pub fn full_command(&self) -> String {
        if self.args.is_empty() {
            self.cmd.clone()
        } else {
            format!("{} {}", self.cmd, self.args.join(" "))
        }
    }

    /// Whether the process has a controlling terminal.
    pub fn in_tty(&self) -> bool {
        self.tty != NO_TTY
    }

    /// Install a handle for a new OS identity of the same logical process.
    pub(crate) fn replace_handle(&mut self, handle: ProcessHandle) {
        self.pid = handle.pid();
        self.handle = handle;
    }

    /// Deliver a signal to the process.
    pub fn signal(&self, signal: i32) -> Result<(), HandleError> {
        self.handle.signal(signal)
    }

    /// Send SIGKILL.
    pub fn kill(&self) -> Result<(), HandleError> {
        self.handle.signal(libc::SIGKILL)
    }

    /// Send SIGTERM.
    pub fn terminate(&self) -> Result<(), HandleError> {
        self.handle.signal(libc::SIGTERM)
    }

    /// Wait for the process to exit (children of the caller only).
    pub fn wait(&self) -> Result<ExitStatus, HandleError> {
        self.handle.wait()
    }

    /// Release the handle; the process keeps running.
    pub fn release(&mut self) {
        self.handle.release();
    }

    /// Whether the handle has been released.
    pub fn is_released(&self) -> bool {
        self.handle.is_released()
    }
}

impl fmt::Display for ProcessRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[Pid]: {}", self.pid)?;
        writeln!(f, "[Command]: {}", self.cmd)?;
        writeln!(f, "[Args]: {}", self.args.join(", "))?;
        writeln!(f, "[Cwd]: {}", self.cwd)?;
        writeln!(f, "[Tty]: {}", self.tty)
    }
}
