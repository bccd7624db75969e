/*!
 * Process Control
 * The scheduler's only window onto OS processes: spawn, resume, pause, wait, kill
 */

use super::launcher::JobLauncher;
use super::types::{ExitStatus, ProcessError, ProcessResult, StateChange, WaitEvent};
use crate::config::JobSpec;
use crate::core::types::Pid;
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use tracing::{debug, trace, warn};

/// Process control interface used by the scheduler loop
pub trait ProcessControl {
    /// Create a process for `spec` that is paused before it runs any of the job's code
    fn spawn_paused(&mut self, spec: &JobSpec) -> ProcessResult<Pid>;

    /// Let a paused process run
    fn resume(&mut self, pid: Pid) -> ProcessResult<()>;

    /// Request a pause. A target that has already exited is not an error.
    fn pause(&mut self, pid: Pid) -> ProcessResult<()>;

    /// Block until `pid` pauses or exits, or a signal interrupts the wait
    fn wait(&mut self, pid: Pid) -> ProcessResult<WaitEvent>;

    /// Forcefully terminate and reap `pid`. Only used when a run is aborted.
    fn kill(&mut self, pid: Pid) -> ProcessResult<()>;
}

/// Translate a platform wait status into a state change.
///
/// `None` means the status carries no state change the scheduler cares about.
pub fn classify(status: WaitStatus) -> Option<StateChange> {
    match status {
        WaitStatus::Stopped(_, _) => Some(StateChange::Paused),
        WaitStatus::Exited(_, code) => Some(StateChange::Exited(ExitStatus::Code(code))),
        WaitStatus::Signaled(_, signal, _) => {
            Some(StateChange::Exited(ExitStatus::Signaled(signal as i32)))
        }
        _ => None,
    }
}

/// Process control backed by real OS processes and signals
#[derive(Debug, Default, Clone)]
pub struct OsProcessControl {
    launcher: JobLauncher,
}

impl OsProcessControl {
    pub fn new() -> Self {
        Self::with_launcher(JobLauncher::new())
    }

    pub fn with_launcher(launcher: JobLauncher) -> Self {
        Self { launcher }
    }

    fn signal(pid: Pid, signal: Signal) -> nix::Result<()> {
        trace!(pid = pid.as_raw(), %signal, "Sending signal");
        kill(pid, signal)
    }
}

impl ProcessControl for OsProcessControl {
    fn spawn_paused(&mut self, spec: &JobSpec) -> ProcessResult<Pid> {
        self.launcher.launch(spec)
    }

    fn resume(&mut self, pid: Pid) -> ProcessResult<()> {
        Self::signal(pid, Signal::SIGCONT).map_err(|errno| ProcessError::SignalFailed {
            pid,
            signal: "SIGCONT",
            errno,
        })
    }

    fn pause(&mut self, pid: Pid) -> ProcessResult<()> {
        match Self::signal(pid, Signal::SIGSTOP) {
            Ok(()) => Ok(()),
            Err(Errno::ESRCH) => {
                debug!(pid = pid.as_raw(), "Pause target already gone");
                Ok(())
            }
            Err(errno) => Err(ProcessError::SignalFailed {
                pid,
                signal: "SIGSTOP",
                errno,
            }),
        }
    }

    fn wait(&mut self, pid: Pid) -> ProcessResult<WaitEvent> {
        match waitpid(pid, Some(WaitPidFlag::WUNTRACED)) {
            Ok(status) => match classify(status) {
                Some(change) => Ok(WaitEvent::Changed(change)),
                None => {
                    trace!(pid = pid.as_raw(), ?status, "Ignoring wait status");
                    Ok(WaitEvent::Interrupted)
                }
            },
            Err(Errno::EINTR) => Ok(WaitEvent::Interrupted),
            Err(errno) => Err(ProcessError::WaitFailed { pid, errno }),
        }
    }

    fn kill(&mut self, pid: Pid) -> ProcessResult<()> {
        match Self::signal(pid, Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(errno) => {
                return Err(ProcessError::SignalFailed {
                    pid,
                    signal: "SIGKILL",
                    errno,
                })
            }
        }

        loop {
            match waitpid(pid, None) {
                Ok(status) if classify(status).is_some() => return Ok(()),
                Ok(_) | Err(Errno::EINTR) => continue,
                Err(Errno::ECHILD) => {
                    warn!(pid = pid.as_raw(), "Killed process was already reaped");
                    return Ok(());
                }
                Err(errno) => return Err(ProcessError::WaitFailed { pid, errno }),
            }
        }
    }
}
