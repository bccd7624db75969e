/*!
 * Launcher Tests
 * Real fork/exec: launch-paused state, candidate fallback and failure exit status
 */

use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use pretty_assertions::assert_eq;
use rr_scheduler::process::{
    ExitStatus, OsProcessControl, ProcessControl, StateChange, WaitEvent,
};
use rr_scheduler::{JobSpec, Pid};
use serial_test::serial;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

fn sh(script: &str) -> JobSpec {
    JobSpec::new(
        "sh",
        vec!["-c".to_string(), script.to_string()],
        &[PathBuf::from("/bin/")],
    )
}

/// Resume and wait until the process exits
fn finish(control: &mut OsProcessControl, pid: Pid) -> ExitStatus {
    control.resume(pid).unwrap();
    loop {
        match control.wait(pid).unwrap() {
            WaitEvent::Changed(StateChange::Exited(status)) => return status,
            WaitEvent::Changed(StateChange::Paused) => control.resume(pid).unwrap(),
            WaitEvent::Interrupted => {}
        }
    }
}

#[test]
#[serial]
fn test_launched_process_stays_paused() {
    let mut control = OsProcessControl::new();
    let pid = control.spawn_paused(&sh("exit 0")).unwrap();

    // Nothing to report while it sits in its launch pause
    assert_eq!(
        waitpid(pid, Some(WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED)).unwrap(),
        WaitStatus::StillAlive
    );

    #[cfg(target_os = "linux")]
    {
        let stat = fs::read_to_string(format!("/proc/{}/stat", pid)).unwrap();
        let state = stat.rsplit(") ").next().and_then(|rest| rest.chars().next());
        assert_eq!(state, Some('T'));
    }

    assert_eq!(finish(&mut control, pid), ExitStatus::Code(0));
}

#[test]
#[serial]
fn test_exit_code_is_reported() {
    let mut control = OsProcessControl::new();
    let pid = control.spawn_paused(&sh("exit 7")).unwrap();
    assert_eq!(finish(&mut control, pid), ExitStatus::Code(7));
}

#[test]
#[serial]
fn test_signal_death_is_reported() {
    let mut control = OsProcessControl::new();
    let pid = control.spawn_paused(&sh("kill -9 $$")).unwrap();
    assert_eq!(finish(&mut control, pid), ExitStatus::Signaled(9));
}

#[test]
#[serial]
fn test_unresolvable_program_exits_127() {
    let mut control = OsProcessControl::new();
    let spec = JobSpec::new(
        "rr-scheduler-no-such-program",
        vec![],
        &[PathBuf::from("./"), PathBuf::from("/bin/")],
    );
    let pid = control.spawn_paused(&spec).unwrap();
    assert_eq!(finish(&mut control, pid), ExitStatus::Code(127));
}

#[test]
#[serial]
fn test_later_candidate_wins() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("rr-job.sh");
    fs::write(&script, "#!/bin/sh\nexit 5\n").unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let spec = JobSpec::new(
        "rr-job.sh",
        vec![],
        &[PathBuf::from("/nonexistent-prefix/"), dir.path().to_path_buf()],
    );
    assert_eq!(spec.candidates.len(), 3);

    let mut control = OsProcessControl::new();
    let pid = control.spawn_paused(&spec).unwrap();
    assert_eq!(finish(&mut control, pid), ExitStatus::Code(5));
}

#[test]
#[serial]
fn test_pause_after_exit_is_absorbed() {
    let mut control = OsProcessControl::new();
    let pid = control.spawn_paused(&sh("exit 0")).unwrap();
    assert_eq!(finish(&mut control, pid), ExitStatus::Code(0));

    // Reaped and gone: the pause request must not fail
    control.pause(pid).unwrap();
}

#[test]
#[serial]
fn test_kill_reaps_paused_process() {
    let mut control = OsProcessControl::new();
    let pid = control.spawn_paused(&sh("sleep 10")).unwrap();
    control.kill(pid).unwrap();
    assert!(waitpid(pid, Some(WaitPidFlag::WNOHANG)).is_err());
}
