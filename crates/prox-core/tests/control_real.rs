//! Control operations against real child processes.

mod support;

use prox_common::ProcessId;
use prox_core::action::{ControlError, Controller};
use prox_core::collect::{Lookup, ToolSource};
use prox_core::config::TerminalConfig;
use prox_core::{HandleError, ProcessHandle, ProcessRecord};
use std::process::Stdio;
use std::sync::mpsc::sync_channel;
use std::thread;
use support::live_harness::{require_tools, LiveChild};

fn controller() -> Controller<ToolSource> {
    Controller::new(Lookup::new(ToolSource::default()), &TerminalConfig::default())
}

#[test]
fn health_check_tracks_kill_and_reap() {
    if !require_tools("health_check_tracks_kill_and_reap", &["ps", "lsof", "sleep"]) {
        return;
    }
    let mut child = LiveChild::spawn().expect("spawn sleep");
    let ctl = controller();
    let record = ctl
        .lookup()
        .resolve_by_pid(ProcessId(child.pid()))
        .expect("resolve child");

    assert!(ctl.health_check(&record).is_ok());

    record.kill().expect("kill");
    let status = record.wait().expect("reap");
    child.disown();
    assert!(!status.success());
    assert!(matches!(
        ctl.health_check(&record),
        Err(ControlError::NotRunning(HandleError::NotFound(_)))
    ));
    // The snapshot survives the process.
    assert_eq!(record.cmd(), "sleep");
}

#[test]
fn health_check_after_release_is_not_running() {
    if !require_tools("health_check_after_release_is_not_running", &["sleep"]) {
        return;
    }
    let child = LiveChild::spawn().expect("spawn sleep");
    let handle = ProcessHandle::attach(ProcessId(child.pid())).expect("attach");
    let mut record = ProcessRecord::new(handle, "??", "", "sleep", child.args());
    let ctl = controller();

    assert!(ctl.health_check(&record).is_ok());
    record.release();
    assert!(ctl.health_check(&record).is_err());
    assert!(matches!(record.terminate(), Err(HandleError::Released(_))));
}

#[test]
fn start_blocks_on_rendezvous_notification() {
    let ctl = controller();
    let handle = ProcessHandle::attach(ProcessId(std::process::id())).expect("attach self");
    let record = ProcessRecord::new(
        handle,
        "??",
        "/",
        "sh",
        vec!["-c".to_string(), "exit 4".to_string()],
    );

    // Zero capacity: the engine cannot continue until the receiver takes it.
    let (tx, rx) = sync_channel(0);
    let receiver = thread::spawn(move || rx.recv().is_ok());

    let status = ctl
        .start(
            &record,
            true,
            Stdio::null(),
            Stdio::null(),
            Stdio::null(),
            Some(&tx),
        )
        .expect("start");
    assert_eq!(status.code(), Some(4));
    assert!(receiver.join().expect("receiver thread"));
}

#[test]
fn open_terminal_of_daemon_fails() {
    let ctl = controller();
    let handle = ProcessHandle::attach(ProcessId(std::process::id())).expect("attach self");
    let record = ProcessRecord::new(handle, "", "/", "daemon", Vec::new());
    assert!(matches!(
        ctl.open_terminal(&record),
        Err(ControlError::NotInTty)
    ));
}
