/*!
 * Round-Robin Scheduler
 *
 * Drives the process ring one quantum at a time:
 *
 * 1. Resume the active job and arm the quantum timer
 * 2. Block until the job pauses or exits (the only blocking point)
 * 3. Disarm the timer, then either keep the job (Ready, advance) or drop it
 *    from the ring (Terminated, remove)
 *
 * Once a single job remains the timer is switched off and that job runs to
 * completion without further preemption.
 */

use super::timer::{PreemptionTimer, QuantumTimer};
use crate::config::JobSpec;
use crate::core::errors::SchedulerError;
use crate::core::types::{JobIndex, Pid, SchedulerResult};
use crate::monitoring::report::{Phase, RunReport, SliceOutcome};
use crate::process::{
    OsProcessControl, ProcessControl, ProcessRing, ProcessState, StateChange, WaitEvent,
};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, trace, warn};
use uuid::Uuid;

/// Single-processor round-robin scheduler
pub struct RoundRobinScheduler<C, T> {
    control: C,
    timer: T,
    quantum: Duration,
}

impl RoundRobinScheduler<OsProcessControl, PreemptionTimer> {
    /// Scheduler over real OS processes, preempted by SIGALRM on the calling thread
    pub fn with_os(quantum: Duration) -> SchedulerResult<Self> {
        Ok(Self::new(quantum, OsProcessControl::new(), PreemptionTimer::new()?))
    }
}

impl<C, T> RoundRobinScheduler<C, T>
where
    C: ProcessControl,
    T: QuantumTimer,
{
    pub fn new(quantum: Duration, control: C, timer: T) -> Self {
        Self {
            control,
            timer,
            quantum,
        }
    }

    /// Launch every job paused, then schedule until all have exited.
    ///
    /// On a fatal error every job still alive is killed and reaped before the
    /// error is returned.
    pub fn run(&mut self, jobs: &[JobSpec]) -> SchedulerResult<RunReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "schedule",
            run_id = %run_id,
            quantum_ms = self.quantum.as_millis() as u64,
            jobs = jobs.len()
        );
        let _entered = span.enter();

        let started = Instant::now();
        let mut ring = ProcessRing::build(jobs.iter().cloned());
        let mut report = RunReport::new(run_id, self.quantum, jobs.len());

        let outcome = self
            .launch_all(&mut ring)
            .and_then(|()| self.drive(&mut ring, &mut report));

        if let Err(e) = outcome {
            error!(error = %e, "Scheduling aborted");
            self.abort(&ring);
            return Err(e);
        }

        report.finish(started.elapsed());
        info!(
            dispatches = report.dispatches.len(),
            preemptions = report.preemptions,
            exits = report.exits,
            "All jobs finished"
        );
        Ok(report)
    }

    /// New -> Ready for every PCR, in launch order
    fn launch_all(&mut self, ring: &mut ProcessRing) -> SchedulerResult<()> {
        for pcr in ring.records_mut() {
            let pid = self.control.spawn_paused(pcr.spec())?;
            pcr.attach(pid)?;
        }
        debug!(count = ring.len(), "All jobs launched");
        Ok(())
    }

    fn drive(&mut self, ring: &mut ProcessRing, report: &mut RunReport) -> SchedulerResult<()> {
        while ring.len() > 1 {
            let (index, pid) = self.dispatch(ring)?;
            self.timer.arm(self.quantum)?;

            let change = self.await_change(pid);
            // Disarm before anything else so no stale expiry reaches the next job
            self.timer.disarm()?;

            match change? {
                StateChange::Paused => {
                    settle_active(ring, report, Phase::RoundRobin, SliceOutcome::Preempted)?;
                    debug!(job = index, pid = pid.as_raw(), "Quantum expired, job paused");
                    ring.advance();
                }
                StateChange::Exited(status) => {
                    settle_active(ring, report, Phase::RoundRobin, SliceOutcome::Exited(status))?;
                    info!(job = index, pid = pid.as_raw(), ?status, "Job exited");
                    ring.remove_active();
                }
            }
        }

        if ring.is_single() {
            self.run_tail(ring, report)?;
        }
        Ok(())
    }

    /// Run the last remaining job to completion with the timer switched off
    fn run_tail(&mut self, ring: &mut ProcessRing, report: &mut RunReport) -> SchedulerResult<()> {
        self.timer.disarm()?;
        let (index, pid) = self.dispatch(ring)?;
        info!(job = index, pid = pid.as_raw(), "Single job left, running to completion");
        report.tail_job = Some(index);

        loop {
            match self.await_change(pid)? {
                StateChange::Exited(status) => {
                    settle_active(ring, report, Phase::Tail, SliceOutcome::Exited(status))?;
                    info!(job = index, pid = pid.as_raw(), ?status, "Job exited");
                    ring.remove_active();
                    return Ok(());
                }
                StateChange::Paused => {
                    // Stopped by someone else; the tail is never preempted
                    warn!(job = index, pid = pid.as_raw(), "Tail job stopped externally, resuming");
                    self.control.resume(pid)?;
                }
            }
        }
    }

    /// Ready -> Running for the active job, then resume it
    fn dispatch(&mut self, ring: &mut ProcessRing) -> SchedulerResult<(JobIndex, Pid)> {
        let pcr = ring
            .active_mut()
            .ok_or_else(|| SchedulerError::RingCorrupted("no active job".into()))?;
        let index = pcr.index();
        let pid = pcr
            .pid()
            .ok_or_else(|| SchedulerError::RingCorrupted(format!("job {index} was never launched")))?;
        pcr.transition(ProcessState::Running)?;
        trace!(job = index, pid = pid.as_raw(), slice = pcr.slices(), "Dispatching");
        self.control.resume(pid)?;
        Ok((index, pid))
    }

    /// Block until `pid` pauses or exits. A quantum expiry observed while
    /// waiting is turned into a pause request here, on the scheduler thread.
    fn await_change(&mut self, pid: Pid) -> SchedulerResult<StateChange> {
        loop {
            if self.timer.take_expired() {
                trace!(pid = pid.as_raw(), "Quantum expired, requesting pause");
                self.control.pause(pid)?;
            }
            match self.control.wait(pid)? {
                WaitEvent::Changed(change) => return Ok(change),
                WaitEvent::Interrupted => continue,
            }
        }
    }

    /// Kill and reap every launched job that has not terminated
    fn abort(&mut self, ring: &ProcessRing) {
        if let Err(e) = self.timer.disarm() {
            warn!(error = %e, "Failed to disarm timer during abort");
        }
        for pcr in ring.records() {
            if pcr.state() == ProcessState::Terminated {
                continue;
            }
            if let Some(pid) = pcr.pid() {
                match self.control.kill(pid) {
                    Ok(()) => debug!(job = pcr.index(), pid = pid.as_raw(), "Killed job"),
                    Err(e) => warn!(job = pcr.index(), error = %e, "Failed to kill job"),
                }
            }
        }
    }
}

/// Apply the slice outcome to the active PCR and log it in the report
fn settle_active(
    ring: &mut ProcessRing,
    report: &mut RunReport,
    phase: Phase,
    outcome: SliceOutcome,
) -> SchedulerResult<()> {
    let pcr = ring
        .active_mut()
        .ok_or_else(|| SchedulerError::RingCorrupted("no active job".into()))?;
    let to = match outcome {
        SliceOutcome::Preempted => ProcessState::Ready,
        SliceOutcome::Exited(_) => ProcessState::Terminated,
    };
    pcr.transition(to)?;
    report.record(pcr, phase, outcome);
    Ok(())
}
