/*!
 * Process Types
 * Process control records and lifecycle types for the scheduler
 */

use crate::config::JobSpec;
use crate::core::limits::SIGNAL_EXIT_BASE;
use crate::core::types::{JobIndex, Pid};
use nix::errno::Errno;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Process operation result
///
/// # Must Use
/// Process operations can fail and must be handled to prevent stray children
pub type ProcessResult<T> = Result<T, ProcessError>;

/// Process errors
#[derive(Error, Debug, Clone)]
pub enum ProcessError {
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidStateTransition {
        from: ProcessState,
        to: ProcessState,
    },

    #[error("Process {pid} already has an OS process attached")]
    AlreadyLaunched { pid: Pid },

    #[error("Failed to send {signal} to PID {pid}: {errno}")]
    SignalFailed {
        pid: Pid,
        signal: &'static str,
        errno: Errno,
    },

    #[error("Failed to wait on PID {pid}: {errno}")]
    WaitFailed { pid: Pid, errno: Errno },
}

/// Process lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    /// Record built, no OS process yet
    New,
    /// Launched and paused, waiting for its turn
    Ready,
    /// Resumed and executing
    Running,
    /// Exited and removed from the ring
    Terminated,
}

impl ProcessState {
    /// Whether the lifecycle graph allows `self -> to`
    #[inline]
    #[must_use]
    pub const fn can_transition_to(self, to: ProcessState) -> bool {
        matches!(
            (self, to),
            (ProcessState::New, ProcessState::Ready)
                | (ProcessState::Ready, ProcessState::Running)
                | (ProcessState::Running, ProcessState::Ready)
                | (ProcessState::Running, ProcessState::Terminated)
        )
    }
}

/// How a job ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum ExitStatus {
    /// Normal exit with a status code
    Code(i32),
    /// Killed by the given signal number
    Signaled(i32),
}

impl ExitStatus {
    /// Shell-style exit code (128 + signal for signal deaths)
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            ExitStatus::Code(code) => code,
            ExitStatus::Signaled(signal) => SIGNAL_EXIT_BASE + signal,
        }
    }

    #[must_use]
    pub const fn success(self) -> bool {
        matches!(self, ExitStatus::Code(0))
    }
}

/// State change observed on a dispatched process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    /// Process stopped (quantum expiry or otherwise)
    Paused,
    /// Process is gone
    Exited(ExitStatus),
}

/// Result of one blocking wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitEvent {
    Changed(StateChange),
    /// The wait was broken by a signal before the process changed state
    Interrupted,
}

/// Process Control Record: the scheduler's bookkeeping for one job
#[derive(Debug, Clone)]
pub struct Pcr {
    index: JobIndex,
    spec: JobSpec,
    pid: Option<Pid>,
    state: ProcessState,
    slices: u32,
    pub(super) next: usize,
}

impl Pcr {
    pub(super) fn new(index: JobIndex, spec: JobSpec, next: usize) -> Self {
        Self {
            index,
            spec,
            pid: None,
            state: ProcessState::New,
            slices: 0,
            next,
        }
    }

    /// Position in specification order
    #[inline]
    pub fn index(&self) -> JobIndex {
        self.index
    }

    #[inline]
    pub fn spec(&self) -> &JobSpec {
        &self.spec
    }

    /// OS handle, present once launched
    #[inline]
    pub fn pid(&self) -> Option<Pid> {
        self.pid
    }

    #[inline]
    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// Number of times this job has been dispatched
    #[inline]
    pub fn slices(&self) -> u32 {
        self.slices
    }

    /// Attach the OS process and move New -> Ready. The handle never changes afterwards.
    pub fn attach(&mut self, pid: Pid) -> ProcessResult<()> {
        if let Some(existing) = self.pid {
            return Err(ProcessError::AlreadyLaunched { pid: existing });
        }
        self.transition(ProcessState::Ready)?;
        self.pid = Some(pid);
        Ok(())
    }

    /// Checked lifecycle transition
    pub fn transition(&mut self, to: ProcessState) -> ProcessResult<()> {
        if !self.state.can_transition_to(to) {
            return Err(ProcessError::InvalidStateTransition {
                from: self.state,
                to,
            });
        }
        if to == ProcessState::Running {
            self.slices += 1;
        }
        self.state = to;
        Ok(())
    }
}
