/*!
 * Run Report
 * Per-run record of every dispatch and how it ended, serializable to JSON
 */

use crate::core::types::JobIndex;
use crate::process::{ExitStatus, Pcr};
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

/// Scheduling phase a dispatch belonged to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Time-sliced, quantum enforced
    RoundRobin,
    /// Last job running to completion
    Tail,
}

/// How a dispatched slice ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SliceOutcome {
    Preempted,
    Exited(ExitStatus),
}

/// One dispatch of one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchRecord {
    pub job: JobIndex,
    pub program: String,
    pub pid: i32,
    /// 1-based slice number for this job
    pub slice: u32,
    pub phase: Phase,
    pub outcome: SliceOutcome,
}

/// Summary of a complete scheduling run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub quantum_ms: u64,
    pub jobs: usize,
    pub dispatches: Vec<DispatchRecord>,
    pub preemptions: u64,
    pub exits: u64,
    /// Job that ran the unthrottled tail, if any
    pub tail_job: Option<JobIndex>,
    /// Exit status per job, in specification order
    pub exit_statuses: Vec<Option<ExitStatus>>,
    pub wall_time_ms: u64,
}

impl RunReport {
    pub fn new(run_id: Uuid, quantum: Duration, jobs: usize) -> Self {
        Self {
            run_id,
            quantum_ms: quantum.as_millis() as u64,
            jobs,
            dispatches: Vec::new(),
            preemptions: 0,
            exits: 0,
            tail_job: None,
            exit_statuses: vec![None; jobs],
            wall_time_ms: 0,
        }
    }

    /// Record the slice that just ended for `pcr`
    pub fn record(&mut self, pcr: &Pcr, phase: Phase, outcome: SliceOutcome) {
        match outcome {
            SliceOutcome::Preempted => self.preemptions += 1,
            SliceOutcome::Exited(status) => {
                self.exits += 1;
                if let Some(slot) = self.exit_statuses.get_mut(pcr.index()) {
                    *slot = Some(status);
                }
            }
        }
        self.dispatches.push(DispatchRecord {
            job: pcr.index(),
            program: pcr.spec().program.clone(),
            pid: pcr.pid().map(|pid| pid.as_raw()).unwrap_or(0),
            slice: pcr.slices(),
            phase,
            outcome,
        });
    }

    pub fn finish(&mut self, elapsed: Duration) {
        self.wall_time_ms = elapsed.as_millis() as u64;
    }

    /// Job indices in the order they were dispatched
    pub fn dispatch_order(&self) -> Vec<JobIndex> {
        self.dispatches.iter().map(|d| d.job).collect()
    }

    /// Number of slices each job received, in specification order
    pub fn slices_per_job(&self) -> Vec<u32> {
        let mut slices = vec![0; self.jobs];
        for dispatch in &self.dispatches {
            if let Some(count) = slices.get_mut(dispatch.job) {
                *count += 1;
            }
        }
        slices
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
