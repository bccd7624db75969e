/*!
 * Preemption Timer
 *
 * One-shot quantum countdown whose expiry interrupts the scheduler's blocking
 * wait. The SIGALRM handler only stores into an atomic flag; the scheduler
 * loop observes the flag and issues the pause itself.
 *
 * # Delivery
 *
 * - POSIX per-process timer (`timer_create`) on CLOCK_MONOTONIC
 * - On Linux the signal is directed at the thread that created the timer, so
 *   it interrupts that thread's `waitpid` even when other threads exist
 * - The handler is installed without SA_RESTART: an interrupted wait returns EINTR
 * - After the first expiry the timer re-fires every `QUANTUM_RENOTIFY` until
 *   disarmed, which covers an expiry landing just before the wait starts
 */

use crate::core::limits::QUANTUM_RENOTIFY;
use nix::errno::Errno;
use nix::libc;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigEvent, SigHandler, SigSet, SigevNotify, Signal};
use nix::sys::time::TimeSpec;
use nix::sys::timer::{Expiration, Timer, TimerSetTimeFlags};
use nix::time::ClockId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Timer errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    #[error("Failed to install SIGALRM handler: {0}")]
    Handler(Errno),

    #[error("Failed to create preemption timer: {0}")]
    Create(Errno),

    #[error("Failed to arm preemption timer: {0}")]
    Arm(Errno),

    #[error("Failed to disarm preemption timer: {0}")]
    Disarm(Errno),
}

/// Quantum countdown used by the scheduler loop
pub trait QuantumTimer {
    /// Start a countdown of `quantum`, discarding any earlier expiry
    fn arm(&mut self, quantum: Duration) -> Result<(), TimerError>;

    /// Stop the countdown. No expiry from before this call is observable afterwards.
    fn disarm(&mut self) -> Result<(), TimerError>;

    /// Whether the quantum has expired since the last arm; clears the flag
    fn take_expired(&mut self) -> bool;
}

/// Set from the signal handler, consumed by the scheduler thread
static QUANTUM_EXPIRED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_quantum_expired(_: libc::c_int) {
    QUANTUM_EXPIRED.store(true, Ordering::SeqCst);
}

/// SIGALRM-driven preemption timer
///
/// Only one instance should exist per process: the expiry flag is shared.
pub struct PreemptionTimer {
    timer: Timer,
    previous_action: SigAction,
    armed: bool,
}

impl PreemptionTimer {
    /// Install the SIGALRM handler and create a timer aimed at the calling thread
    pub fn new() -> Result<Self, TimerError> {
        let action = SigAction::new(
            SigHandler::Handler(on_quantum_expired),
            SaFlags::empty(),
            SigSet::empty(),
        );
        // SAFETY: the handler only performs an atomic store, which is async-signal-safe.
        let previous_action =
            unsafe { sigaction(Signal::SIGALRM, &action) }.map_err(TimerError::Handler)?;

        let mut unblock = SigSet::empty();
        unblock.add(Signal::SIGALRM);
        unblock.thread_unblock().map_err(TimerError::Handler)?;

        let timer = Timer::new(ClockId::CLOCK_MONOTONIC, SigEvent::new(Self::notification()))
            .map_err(TimerError::Create)?;
        QUANTUM_EXPIRED.store(false, Ordering::SeqCst);

        debug!("Preemption timer initialized");
        Ok(Self {
            timer,
            previous_action,
            armed: false,
        })
    }

    #[cfg(target_os = "linux")]
    fn notification() -> SigevNotify {
        SigevNotify::SigevThreadId {
            signal: Signal::SIGALRM,
            thread_id: nix::unistd::gettid().as_raw(),
            si_value: 0,
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn notification() -> SigevNotify {
        SigevNotify::SigevSignal {
            signal: Signal::SIGALRM,
            si_value: 0,
        }
    }

    /// Whether a countdown is currently running
    pub fn is_armed(&self) -> bool {
        self.armed
    }
}

impl QuantumTimer for PreemptionTimer {
    fn arm(&mut self, quantum: Duration) -> Result<(), TimerError> {
        self.timer
            .set(
                Expiration::IntervalDelayed(
                    TimeSpec::from_duration(quantum),
                    TimeSpec::from_duration(QUANTUM_RENOTIFY),
                ),
                TimerSetTimeFlags::empty(),
            )
            .map_err(TimerError::Arm)?;
        // Same ordering as `disarm`: a re-fire of the previous countdown has
        // been handled by now, while an early expiry of this one is repeated.
        QUANTUM_EXPIRED.store(false, Ordering::SeqCst);
        self.armed = true;
        trace!(quantum_ms = quantum.as_millis() as u64, "Timer armed");
        Ok(())
    }

    fn disarm(&mut self) -> Result<(), TimerError> {
        self.timer
            .set(
                Expiration::OneShot(TimeSpec::new(0, 0)),
                TimerSetTimeFlags::empty(),
            )
            .map_err(TimerError::Disarm)?;
        self.armed = false;
        // A thread-directed expiry generated before timer_settime returned has
        // already run its handler, so clearing here drops it for good.
        QUANTUM_EXPIRED.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn take_expired(&mut self) -> bool {
        QUANTUM_EXPIRED.swap(false, Ordering::SeqCst)
    }
}

impl Drop for PreemptionTimer {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = self.disarm() {
                warn!(error = %e, "Failed to disarm preemption timer on drop");
            }
        }
        // SAFETY: restores the disposition that was in place before `new`.
        if let Err(e) = unsafe { sigaction(Signal::SIGALRM, &self.previous_action) } {
            warn!(error = %e, "Failed to restore SIGALRM disposition");
        }
    }
}
