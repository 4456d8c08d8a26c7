//! Platform process handle.
//!
//! A thin capability bound to one pid: deliver a signal, wait for exit,
//! or release the handle without waiting. Signal delivery is `kill(2)`,
//! waiting is `waitpid(2)` and only works for children of the caller.

use prox_common::ProcessId;
use std::process::ExitStatus;
use thiserror::Error;
use tracing::{debug, trace};

/// Errors from handle operations.
#[derive(Debug, Error)]
pub enum HandleError {
    #[error("invalid pid {0}")]
    InvalidPid(ProcessId),

    #[error("process {0} not found")]
    NotFound(ProcessId),

    #[error("permission denied signaling process {0}")]
    PermissionDenied(ProcessId),

    #[error("process {0} already released")]
    Released(ProcessId),

    #[error("invalid signal {0}")]
    InvalidSignal(i32),

    #[error("OS error: {0}")]
    Os(#[from] std::io::Error),
}

impl From<HandleError> for prox_common::Error {
    fn from(err: HandleError) -> Self {
        use prox_common::Error;
        match err {
            HandleError::InvalidPid(pid) | HandleError::NotFound(pid) => {
                Error::ProcessNotFound { pid: pid.0 }
            }
            HandleError::PermissionDenied(pid) => Error::PermissionDenied { pid: pid.0 },
            HandleError::Released(pid) => Error::Released { pid: pid.0 },
            HandleError::InvalidSignal(_) => {
                Error::Os(std::io::Error::from_raw_os_error(libc::EINVAL))
            }
            HandleError::Os(e) => Error::Os(e),
        }
    }
}

/// Owned handle to an OS process.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: ProcessId,
    raw: i32,
    released: bool,
}

impl ProcessHandle {
    /// Obtain a handle for `pid`.
    ///
    /// The process must exist and be signalable by the caller.
    pub fn attach(pid: ProcessId) -> Result<Self, HandleError> {
        let raw = pid.as_raw().ok_or(HandleError::InvalidPid(pid))?;
        let handle = Self {
            pid,
            raw,
            released: false,
        };
        handle.signal(0)?;
        debug!(pid = pid.0, "attached process handle");
        Ok(handle)
    }

    /// The pid this handle is bound to.
    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    /// Whether [`release`](Self::release) has been called.
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Deliver `signal` to the process. Signal 0 only probes for existence.
    pub fn signal(&self, signal: i32) -> Result<(), HandleError> {
        if self.released {
            return Err(HandleError::Released(self.pid));
        }

        trace!(pid = self.pid.0, signal, "kill");
        let result = unsafe { libc::kill(self.raw, signal) };
        if result == 0 {
            return Ok(());
        }

        let err = std::io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::ESRCH) => Err(HandleError::NotFound(self.pid)),
            Some(libc::EPERM) => Err(HandleError::PermissionDenied(self.pid)),
            Some(libc::EINVAL) => Err(HandleError::InvalidSignal(signal)),
            _ => Err(HandleError::Os(err)),
        }
    }

    /// Block until the process exits and reap it.
    ///
    /// Fails with `ECHILD` when the process is not a child of the caller.
    pub fn wait(&self) -> Result<ExitStatus, HandleError> {
        use std::os::unix::process::ExitStatusExt;

        if self.released {
            return Err(HandleError::Released(self.pid));
        }

        let mut status: libc::c_int = 0;
        loop {
            let result = unsafe { libc::waitpid(self.raw, &mut status, 0) };
            if result == self.raw {
                return Ok(ExitStatus::from_raw(status));
            }
            let err = std::io::Error::last_os_error();
            if err.kind() != std::io::ErrorKind::Interrupted {
                return Err(HandleError::Os(err));
            }
        }
    }

    /// Give up the handle without waiting.
    ///
    /// The OS process keeps running; every later operation on this handle
    /// fails with [`HandleError::Released`]. Releasing twice is a no-op.
    pub fn release(&mut self) {
        if !self.released {
            debug!(pid = self.pid.0, "released process handle");
        }
        self.released = true;
    }
}
