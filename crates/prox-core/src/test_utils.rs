//! Test utilities for prox-core.
//!
//! - `assert_ok!` / `assert_err!` macros
//! - Tool availability checks for tests that need real `ps`/`lsof`
//! - [`ProcessHarness`] for spawning real child processes (no mocks)

use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};

/// Assert that a Result is Ok and return the value.
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(val) => val,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
    ($expr:expr, $msg:expr) => {
        match $expr {
            Ok(val) => val,
            Err(e) => panic!("{}: {:?}", $msg, e),
        }
    };
}

/// Assert that a Result is Err and return the error.
#[macro_export]
macro_rules! assert_err {
    ($expr:expr) => {
        match $expr {
            Ok(val) => panic!("Expected Err, got Ok: {:?}", val),
            Err(e) => e,
        }
    };
}

/// Whether `cmd` can be found on PATH.
pub fn command_exists(cmd: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {} >/dev/null 2>&1", cmd))
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Whether every tool in `tools` is on PATH; logs a skip message otherwise.
pub fn tools_available(tools: &[&str]) -> bool {
    match tools.iter().find(|t| !command_exists(t)) {
        Some(missing) => {
            eprintln!("Skipping: {} not available", missing);
            false
        }
        None => true,
    }
}

static SLEEP_SECONDS: AtomicU64 = AtomicU64::new(0);

/// Spawns real children with distinguishable command lines.
#[derive(Debug, Default)]
pub struct ProcessHarness;

impl ProcessHarness {
    /// Spawn `sleep N` in `dir`, where N is unique within this test process.
    ///
    /// The duration doubles as a fingerprint: no two harness children share
    /// a command line.
    pub fn spawn_sleep_in(&self, dir: &Path) -> std::io::Result<SpawnedProcess> {
        let seconds = 7000 + u64::from(std::process::id() % 1000) * 100
            + SLEEP_SECONDS.fetch_add(1, Ordering::SeqCst);
        let child = Command::new("sleep")
            .arg(seconds.to_string())
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(SpawnedProcess {
            child,
            args: vec![seconds.to_string()],
        })
    }
}

/// A child killed and reaped on drop.
#[derive(Debug)]
pub struct SpawnedProcess {
    child: Child,
    args: Vec<String>,
}

impl SpawnedProcess {
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Arguments the child was started with.
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl Drop for SpawnedProcess {
    fn drop(&mut self) {
        if let Ok(Some(_)) = self.child.try_wait() {
            return;
        }
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
