/*!
 * Job Launcher
 * Creates one OS process per job, held paused until the scheduler dispatches it
 *
 * The child stops itself with SIGSTOP right after fork and only then walks its
 * candidate list with execv. Everything the child touches is prepared before
 * fork, so the child side makes async-signal-safe calls only.
 */

use super::types::{ProcessError, ProcessResult};
use crate::config::JobSpec;
use crate::core::limits::LAUNCH_FAILURE_EXIT_CODE;
use crate::core::types::Pid;
use nix::errno::Errno;
use nix::libc;
use nix::sys::signal::{raise, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{fork, ForkResult};
use std::ffi::{CString, OsStr};
use std::os::raw::c_char;
use std::os::unix::ffi::OsStrExt;
use tracing::{debug, info};

/// Exec arguments converted ahead of fork
struct PreparedExec {
    candidates: Vec<CString>,
    // Owns the strings `argv_ptrs` points into
    _argv: Vec<CString>,
    argv_ptrs: Vec<*const c_char>,
}

impl PreparedExec {
    fn new(spec: &JobSpec) -> ProcessResult<Self> {
        if spec.candidates.is_empty() {
            return Err(ProcessError::InvalidCommand(format!(
                "no executable candidates for '{}'",
                spec.program
            )));
        }

        let candidates = spec
            .candidates
            .iter()
            .map(|path| to_cstring(path.as_os_str()))
            .collect::<ProcessResult<Vec<_>>>()?;
        let argv = spec
            .args
            .iter()
            .map(|arg| to_cstring(OsStr::new(arg)))
            .collect::<ProcessResult<Vec<_>>>()?;

        let mut argv_ptrs: Vec<*const c_char> = argv.iter().map(|arg| arg.as_ptr()).collect();
        argv_ptrs.push(std::ptr::null());

        Ok(Self {
            candidates,
            _argv: argv,
            argv_ptrs,
        })
    }

    /// Child side: pause, then try each candidate. Never returns.
    fn exec_paused(&self) -> ! {
        let _ = raise(Signal::SIGSTOP);
        for candidate in &self.candidates {
            // SAFETY: both pointers reference NUL-terminated data owned by
            // `self`, and `argv_ptrs` ends with a null pointer. execv only
            // returns on failure.
            unsafe {
                libc::execv(candidate.as_ptr(), self.argv_ptrs.as_ptr());
            }
        }
        // SAFETY: _exit is async-signal-safe and skips the parent's atexit state.
        unsafe { libc::_exit(LAUNCH_FAILURE_EXIT_CODE) }
    }
}

fn to_cstring(value: &OsStr) -> ProcessResult<CString> {
    CString::new(value.as_bytes()).map_err(|_| {
        ProcessError::InvalidCommand(format!(
            "argument contains an interior NUL byte: {:?}",
            value
        ))
    })
}

/// Launches jobs in the launch-paused state
#[derive(Debug, Default, Clone, Copy)]
pub struct JobLauncher;

impl JobLauncher {
    pub fn new() -> Self {
        Self
    }

    /// Fork a paused child for `spec` and return its PID once the child has
    /// reported the stop.
    pub fn launch(&self, spec: &JobSpec) -> ProcessResult<Pid> {
        let prepared = PreparedExec::new(spec)?;

        // SAFETY: the child only calls raise, execv and _exit on data
        // prepared above; it never allocates or takes locks.
        match unsafe { fork() } {
            Ok(ForkResult::Child) => prepared.exec_paused(),
            Ok(ForkResult::Parent { child }) => {
                self.await_launch_pause(child, spec)?;
                info!(
                    pid = child.as_raw(),
                    program = %spec.program,
                    "Launched job (paused)"
                );
                Ok(child)
            }
            Err(errno) => Err(ProcessError::SpawnFailed(format!(
                "fork for '{}': {}",
                spec.program, errno
            ))),
        }
    }

    /// Block until the child has stopped itself
    fn await_launch_pause(&self, child: Pid, spec: &JobSpec) -> ProcessResult<()> {
        loop {
            match waitpid(child, Some(WaitPidFlag::WUNTRACED)) {
                Ok(WaitStatus::Stopped(_, signal)) => {
                    debug!(pid = child.as_raw(), ?signal, "Child reached launch pause");
                    return Ok(());
                }
                Ok(WaitStatus::Exited(_, code)) => {
                    return Err(ProcessError::SpawnFailed(format!(
                        "'{}' exited with {} before reaching its launch pause",
                        spec.program, code
                    )));
                }
                Ok(WaitStatus::Signaled(_, signal, _)) => {
                    return Err(ProcessError::SpawnFailed(format!(
                        "'{}' killed by {} before reaching its launch pause",
                        spec.program, signal
                    )));
                }
                Ok(_) | Err(Errno::EINTR) => continue,
                Err(errno) => return Err(ProcessError::WaitFailed { pid: child, errno }),
            }
        }
    }
}
