//! Keystroke injection into a terminal device via `TIOCSTI`.
//!
//! Each byte is pushed into the terminal's input queue as if typed. This
//! needs either the caller's controlling terminal or `CAP_SYS_ADMIN`, and
//! Linux 6.2+ only allows it when `dev.tty.legacy_tiocsti` is enabled.

use std::os::unix::io::AsRawFd;
use thiserror::Error;
use tracing::trace;

/// Injection stopped part way through.
#[derive(Debug, Error)]
#[error("terminal injection failed after {injected} bytes: {source}")]
pub struct InjectError {
    /// Bytes already delivered; they are not taken back.
    pub injected: usize,
    #[source]
    pub source: std::io::Error,
}

/// Push `bytes` into the input queue of `terminal`, one ioctl per byte.
pub fn inject_bytes<T: AsRawFd>(terminal: &T, bytes: &[u8]) -> Result<(), InjectError> {
    let fd = terminal.as_raw_fd();
    for (injected, byte) in bytes.iter().enumerate() {
        let result = unsafe { libc::ioctl(fd, libc::TIOCSTI, byte as *const u8) };
        if result == -1 {
            return Err(InjectError {
                injected,
                source: std::io::Error::last_os_error(),
            });
        }
    }
    trace!(fd, len = bytes.len(), "injected bytes");
    Ok(())
}
