//! Process control: liveness, (re)starting, terminal re-injection.
//!
//! [`Controller`] drives a [`ProcessRecord`] produced by the lookup engine.
//! Everything is synchronous. The only coordination point is the optional
//! start notification, a `SyncSender<()>` that receives one message once
//! the process is running.

use super::inject::{inject_bytes, InjectError};
use crate::collect::{Lookup, LookupError, ProcessSource};
use crate::config::TerminalConfig;
use crate::handle::HandleError;
use crate::record::ProcessRecord;
use std::fs::{File, OpenOptions};
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::SyncSender;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Errors from control operations.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("process is not running")]
    NotRunning(#[source] HandleError),

    #[error("process is not in a tty")]
    NotInTty,

    #[error("process working directory is unresolved")]
    CwdUnresolved,

    #[error("failed to start {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for {command}: {source}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Inject(#[from] InjectError),

    #[error("failed to open terminal {path}: {source}")]
    OpenTerminal {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to change directory to {path}: {source}")]
    ChangeDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

impl From<ControlError> for prox_common::Error {
    fn from(err: ControlError) -> Self {
        use prox_common::Error;
        match err {
            ControlError::NotRunning(e) => e.into(),
            ControlError::NotInTty => Error::NotInTty,
            ControlError::CwdUnresolved => Error::CwdUnresolved,
            ControlError::Spawn { source, .. }
            | ControlError::Wait { source, .. }
            | ControlError::OpenTerminal { source, .. }
            | ControlError::ChangeDirectory { source, .. } => Error::Os(source),
            ControlError::Inject(e) => Error::Os(e.source),
            ControlError::Lookup(e) => e.into(),
        }
    }
}

/// Send the one-shot start notification, if anyone asked for it.
fn notify_started(notify: Option<&SyncSender<()>>) {
    if let Some(tx) = notify {
        if tx.send(()).is_err() {
            warn!("start notification receiver disconnected");
        }
    }
}

/// Control engine bound to a lookup engine and a terminal device directory.
#[derive(Debug, Clone)]
pub struct Controller<S> {
    lookup: Lookup<S>,
    device_dir: PathBuf,
}

impl<S: ProcessSource> Controller<S> {
    pub fn new(lookup: Lookup<S>, terminal: &TerminalConfig) -> Self {
        Self {
            lookup,
            device_dir: terminal.device_dir.clone(),
        }
    }

    pub fn lookup(&self) -> &Lookup<S> {
        &self.lookup
    }

    /// Probe the process with signal 0. Any failure means "not running".
    pub fn health_check(&self, record: &ProcessRecord) -> Result<(), ControlError> {
        record.signal(0).map_err(ControlError::NotRunning)
    }

    /// Run `record`'s command line as a new child and wait for it.
    ///
    /// With `detach`, a process from a terminal gets its own process group
    /// and one without a terminal gets a new session. `notify` receives one
    /// message after a successful spawn; a spawn failure sends nothing.
    #[instrument(skip_all, fields(cmd = %record.cmd(), detach = detach))]
    pub fn start(
        &self,
        record: &ProcessRecord,
        detach: bool,
        stdin: Stdio,
        stdout: Stdio,
        stderr: Stdio,
        notify: Option<&SyncSender<()>>,
    ) -> Result<ExitStatus, ControlError> {
        let mut command = Command::new(record.cmd());
        command
            .args(record.args())
            .stdin(stdin)
            .stdout(stdout)
            .stderr(stderr);

        if detach {
            if record.in_tty() {
                command.process_group(0);
            } else {
                unsafe {
                    command.pre_exec(|| {
                        if libc::setsid() == -1 {
                            return Err(std::io::Error::last_os_error());
                        }
                        Ok(())
                    });
                }
            }
        }

        let mut child = command.spawn().map_err(|source| ControlError::Spawn {
            command: record.full_command(),
            source,
        })?;
        info!(pid = child.id(), "started process");
        notify_started(notify);

        let status = child.wait().map_err(|source| ControlError::Wait {
            command: record.full_command(),
            source,
        })?;
        debug!(?status, "process exited");
        Ok(status)
    }

    /// Type `record`'s command line into `tty` and adopt the new process.
    ///
    /// Bytes already injected stay in the terminal when a later byte fails.
    /// After injection the record is re-resolved by fingerprint, which
    /// replaces its pid and handle, and then `notify` is signalled.
    #[instrument(skip_all, fields(pid = record.pid().0))]
    pub fn start_in_terminal(
        &self,
        record: &mut ProcessRecord,
        tty: &File,
        notify: Option<&SyncSender<()>>,
    ) -> Result<(), ControlError> {
        let line = format!("{}\n", record.full_command());
        inject_bytes(tty, line.as_bytes())?;
        info!(command = %record.full_command(), "injected command into terminal");

        self.lookup.refresh(record)?;
        notify_started(notify);
        Ok(())
    }

    /// Open the terminal device of `record` for reading and writing.
    pub fn open_terminal(&self, record: &ProcessRecord) -> Result<File, ControlError> {
        if !record.in_tty() {
            return Err(ControlError::NotInTty);
        }
        let path = self.device_dir.join(record.tty());
        debug!(path = %path.display(), "opening terminal");
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|source| ControlError::OpenTerminal { path, source })
    }

    /// Change the working directory of the current process to `record`'s.
    pub fn change_directory(&self, record: &ProcessRecord) -> Result<(), ControlError> {
        if record.cwd().is_empty() {
            return Err(ControlError::CwdUnresolved);
        }
        let path = PathBuf::from(record.cwd());
        std::env::set_current_dir(&path)
            .map_err(|source| ControlError::ChangeDirectory { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::{Query, ToolError, ToolSource};
    use crate::handle::ProcessHandle;
    use prox_common::ProcessId;
    use std::io::Read;
    use std::os::unix::io::FromRawFd;
    use std::sync::mpsc::sync_channel;

    fn controller() -> Controller<ToolSource> {
        Controller::new(Lookup::new(ToolSource::default()), &TerminalConfig::default())
    }

    fn record(tty: &str, cwd: &str, cmd: &str, args: &[&str]) -> ProcessRecord {
        let handle = ProcessHandle::attach(ProcessId(std::process::id())).unwrap();
        ProcessRecord::new(
            handle,
            tty,
            cwd,
            cmd,
            args.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn quiet() -> (Stdio, Stdio, Stdio) {
        (Stdio::null(), Stdio::null(), Stdio::null())
    }

    fn ps_available() -> bool {
        Command::new("ps")
            .args(["-o", "pid=", "-p", "1"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    #[test]
    fn test_health_check_alive_then_released() {
        let ctl = controller();
        let mut rec = record("??", "/", "self", &[]);
        assert!(ctl.health_check(&rec).is_ok());
        rec.release();
        assert!(matches!(
            ctl.health_check(&rec),
            Err(ControlError::NotRunning(HandleError::Released(_)))
        ));
    }

    #[test]
    fn test_health_check_after_kill_and_reap() {
        let child = Command::new("sleep").arg("30").spawn().expect("spawn sleep");
        let handle = ProcessHandle::attach(ProcessId(child.id())).unwrap();
        let rec = ProcessRecord::new(handle, "??", "/", "sleep", vec!["30".to_string()]);
        let ctl = controller();
        assert!(ctl.health_check(&rec).is_ok());
        rec.kill().unwrap();
        rec.wait().unwrap();
        assert!(ctl.health_check(&rec).is_err());
    }

    #[test]
    fn test_start_returns_exit_status_and_notifies() {
        let ctl = controller();
        let rec = record("??", "/", "sh", &["-c", "exit 3"]);
        let (tx, rx) = sync_channel(1);
        let (i, o, e) = quiet();
        let status = ctl.start(&rec, false, i, o, e, Some(&tx)).unwrap();
        assert_eq!(status.code(), Some(3));
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_start_disconnected_receiver_is_ignored() {
        let ctl = controller();
        let rec = record("??", "/", "true", &[]);
        let (tx, rx) = sync_channel(1);
        drop(rx);
        let (i, o, e) = quiet();
        assert!(ctl.start(&rec, false, i, o, e, Some(&tx)).unwrap().success());
    }

    #[test]
    fn test_start_spawn_failure_sends_nothing() {
        let ctl = controller();
        let rec = record("??", "/", "prox-no-such-binary", &[]);
        let (tx, rx) = sync_channel(1);
        let (i, o, e) = quiet();
        let err = ctl.start(&rec, false, i, o, e, Some(&tx)).unwrap_err();
        assert!(matches!(err, ControlError::Spawn { .. }));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_start_uses_given_stdout() {
        let ctl = controller();
        let rec = record("??", "/", "echo", &["hello", "world"]);
        let mut out = tempfile::tempfile().unwrap();
        let status = ctl
            .start(
                &rec,
                false,
                Stdio::null(),
                Stdio::from(out.try_clone().unwrap()),
                Stdio::null(),
                None,
            )
            .unwrap();
        assert!(status.success());
        let mut text = String::new();
        std::io::Seek::rewind(&mut out).unwrap();
        out.read_to_string(&mut text).unwrap();
        assert_eq!(text, "hello world\n");
    }

    fn capture(ctl: &Controller<ToolSource>, rec: &ProcessRecord, detach: bool) -> String {
        let mut out = tempfile::tempfile().unwrap();
        ctl.start(
            rec,
            detach,
            Stdio::null(),
            Stdio::from(out.try_clone().unwrap()),
            Stdio::null(),
            None,
        )
        .unwrap();
        let mut text = String::new();
        std::io::Seek::rewind(&mut out).unwrap();
        out.read_to_string(&mut text).unwrap();
        text
    }

    #[test]
    fn test_detach_without_tty_starts_new_session() {
        if !ps_available() {
            eprintln!("Skipping: ps not available");
            return;
        }
        let ctl = controller();
        let rec = record("??", "/", "sh", &["-c", "ps -o sid= -p $$; echo $$"]);
        let text = capture(&ctl, &rec, true);
        let lines: Vec<&str> = text.split_whitespace().collect();
        assert_eq!(lines.len(), 2, "{text:?}");
        assert_eq!(lines[0], lines[1], "child should lead its own session");
    }

    #[test]
    fn test_detach_with_tty_starts_new_process_group() {
        if !ps_available() {
            eprintln!("Skipping: ps not available");
            return;
        }
        let ctl = controller();
        let rec = record("pts/0", "/", "sh", &["-c", "ps -o pgid= -p $$; echo $$"]);
        let text = capture(&ctl, &rec, true);
        let lines: Vec<&str> = text.split_whitespace().collect();
        assert_eq!(lines.len(), 2, "{text:?}");
        assert_eq!(lines[0], lines[1], "child should lead its own process group");
    }

    #[test]
    fn test_open_terminal_without_tty() {
        let ctl = controller();
        let rec = record("??", "/", "daemon", &[]);
        assert!(matches!(ctl.open_terminal(&rec), Err(ControlError::NotInTty)));
    }

    #[test]
    fn test_open_terminal_joins_device_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("pts")).unwrap();
        std::fs::write(dir.path().join("pts").join("7"), b"").unwrap();
        let ctl = Controller::new(
            Lookup::new(ToolSource::default()),
            &TerminalConfig {
                device_dir: dir.path().to_path_buf(),
            },
        );
        assert!(ctl.open_terminal(&record("pts/7", "/", "zsh", &[])).is_ok());
        match ctl.open_terminal(&record("pts/8", "/", "zsh", &[])) {
            Err(ControlError::OpenTerminal { path, .. }) => {
                assert_eq!(path, dir.path().join("pts/8"))
            }
            other => panic!("expected OpenTerminal error, got {other:?}"),
        }
    }

    #[test]
    fn test_start_in_terminal_injection_failure_skips_lookup() {
        let ctl = controller();
        let mut rec = record("pts/0", "/", "sleep", &["5"]);
        let before = rec.pid();
        let not_a_tty = tempfile::tempfile().unwrap();
        let (tx, rx) = sync_channel(1);
        let err = ctl
            .start_in_terminal(&mut rec, &not_a_tty, Some(&tx))
            .unwrap_err();
        assert!(matches!(err, ControlError::Inject(ref e) if e.injected == 0));
        assert_eq!(rec.pid(), before);
        assert!(rx.try_recv().is_err());
    }

    /// Source whose listing is fixed; every per-pid query fails.
    struct ListingSource(String);

    impl ProcessSource for ListingSource {
        fn list_all(&self) -> Result<String, ToolError> {
            Ok(self.0.clone())
        }
        fn tty_and_command(&self, _pid: ProcessId) -> Result<String, ToolError> {
            Err(ToolError::CommandNotFound("ps".to_string()))
        }
        fn command_line(&self, _pid: ProcessId) -> Result<String, ToolError> {
            Err(ToolError::CommandNotFound("ps".to_string()))
        }
        fn open_files(&self, _pid: ProcessId) -> Result<String, ToolError> {
            Err(ToolError::CommandNotFound("lsof".to_string()))
        }
        fn tool_name(&self, _query: Query) -> &str {
            "listing"
        }
    }

    /// A fresh pseudo-terminal pair as (master, slave).
    fn open_pty() -> Option<(File, File)> {
        let mut master = -1;
        let mut slave = -1;
        let rc = unsafe {
            libc::openpty(
                &mut master,
                &mut slave,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                std::ptr::null_mut(),
            )
        };
        if rc != 0 {
            return None;
        }
        unsafe { Some((File::from_raw_fd(master), File::from_raw_fd(slave))) }
    }

    #[test]
    fn test_start_in_terminal_injects_line_and_adopts_new_pid() {
        use crate::test_utils::{tools_available, ProcessHarness};

        if !tools_available(&["sleep"]) {
            return;
        }
        let Some((_master, mut slave)) = open_pty() else {
            crate::test_log!(INFO, "skipping: openpty unavailable");
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        let child = crate::assert_ok!(ProcessHarness.spawn_sleep_in(dir.path()));
        let listing = format!(
            "    1 ?        00:00:01 /sbin/init\n {} pts/9    00:00:00 sleep {}\n",
            child.pid(),
            child.args()[0]
        );
        let ctl = Controller::new(
            Lookup::new(ListingSource(listing)),
            &TerminalConfig::default(),
        );

        let mut rec = record("pts/9", "/", "sleep", &[child.args()[0].as_str()]);
        let before = rec.pid();
        let (tx, rx) = sync_channel(1);
        match ctl.start_in_terminal(&mut rec, &slave, Some(&tx)) {
            Ok(()) => {}
            Err(ControlError::Inject(e))
                if matches!(e.source.raw_os_error(), Some(libc::EPERM | libc::EIO)) =>
            {
                crate::test_log!(INFO, "skipping: TIOCSTI not permitted", error = e.to_string());
                return;
            }
            Err(other) => panic!("start_in_terminal failed: {other:?}"),
        }

        // Canonical mode hands back exactly the injected line.
        let mut buf = [0u8; 256];
        let n = slave.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], format!("sleep {}\n", child.args()[0]).as_bytes());

        assert_ne!(rec.pid(), before);
        assert_eq!(rec.pid(), ProcessId(child.pid()));
        assert!(ctl.health_check(&rec).is_ok());
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_change_directory_unresolved() {
        let ctl = controller();
        let rec = record("??", "", "x", &[]);
        assert!(matches!(
            ctl.change_directory(&rec),
            Err(ControlError::CwdUnresolved)
        ));
    }

    #[test]
    fn test_change_directory_missing_dir() {
        let ctl = controller();
        let rec = record("??", "/nonexistent/prox/dir", "x", &[]);
        assert!(matches!(
            ctl.change_directory(&rec),
            Err(ControlError::ChangeDirectory { .. })
        ));
    }

    #[test]
    fn test_change_directory_to_current() {
        let ctl = controller();
        let here = std::env::current_dir().unwrap();
        let rec = record("??", here.to_str().unwrap(), "x", &[]);
        ctl.change_directory(&rec).unwrap();
        assert_eq!(std::env::current_dir().unwrap(), here);
    }
}
