//! Live process harness for no-mock integration tests.
//!
//! Spawns real `sleep` children in their own temp directories so that the
//! lookup engine can be checked against values known up front.

#![allow(dead_code)]
// Each test binary uses a different subset of these helpers.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU32, Ordering};

static COUNTER: AtomicU32 = AtomicU32::new(0);

/// Whether `cmd` resolves to an executable on PATH.
pub fn command_exists(cmd: &str) -> bool {
    if cmd.contains('/') {
        return Path::new(cmd).exists();
    }
    let Some(path) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&path).any(|dir| dir.join(cmd).is_file())
}

/// True when all `tools` exist; otherwise prints a skip notice.
pub fn require_tools(test: &str, tools: &[&str]) -> bool {
    for tool in tools {
        if !command_exists(tool) {
            eprintln!("Skipping {test}: {tool} not available");
            return false;
        }
    }
    true
}

/// A `sleep` child with a unique argument, running in its own directory.
pub struct LiveChild {
    child: Option<Child>,
    dir: tempfile::TempDir,
    seconds: String,
}

impl LiveChild {
    pub fn spawn() -> std::io::Result<Self> {
        let dir = tempfile::tempdir()?;
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let seconds = (8000 + (std::process::id() % 1000) * 10 + n).to_string();
        let child = Command::new("sleep")
            .arg(&seconds)
            .current_dir(dir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(Self {
            child: Some(child),
            dir,
            seconds,
        })
    }

    pub fn pid(&self) -> u32 {
        self.child.as_ref().map(Child::id).unwrap_or_default()
    }

    pub fn args(&self) -> Vec<String> {
        vec![self.seconds.clone()]
    }

    /// The command line as `ps` shows it.
    pub fn command_line(&self) -> String {
        format!("sleep {}", self.seconds)
    }

    pub fn dir(&self) -> PathBuf {
        self.dir
            .path()
            .canonicalize()
            .unwrap_or_else(|_| self.dir.path().to_path_buf())
    }

    /// Forget the std handle once the child was reaped elsewhere.
    pub fn disown(&mut self) {
        self.child = None;
    }
}

impl Drop for LiveChild {
    fn drop(&mut self) {
        if let Some(child) = self.child.as_mut() {
            if let Ok(Some(_)) = child.try_wait() {
                return;
            }
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// The tty of `pid` as reported directly by `ps`, in canonical form.
pub fn ps_tty(pid: u32) -> Option<String> {
    let output = Command::new("ps")
        .args(["-o", "tty=", "-p", &pid.to_string()])
        .output()
        .ok()?;
    let text = String::from_utf8_lossy(&output.stdout);
    text.split_whitespace()
        .next()
        .map(prox_common::canonical_tty)
}

/// A pid that is guaranteed not to be running: a reaped child of ours.
pub fn dead_pid() -> u32 {
    let mut child = Command::new("true").spawn().expect("spawn true");
    let pid = child.id();
    child.wait().expect("reap true");
    pid
}
