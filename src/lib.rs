/*!
 * Round-Robin Process Scheduler Library
 * Launches a fixed set of programs paused and time-slices them with SIGSTOP/SIGCONT
 */

pub mod config;
pub mod core;
pub mod monitoring;
pub mod process;
pub mod scheduler;

// Re-exports
pub use config::{parse_args, JobSpec, RuntimeSettings, SchedulerConfig};
pub use crate::core::errors::SchedulerError;
pub use crate::core::types::{JobIndex, Pid, SchedulerResult};
pub use monitoring::{init_tracing, RunReport};
pub use process::{ExitStatus, ProcessRing, ProcessState};
pub use scheduler::{PreemptionTimer, QuantumTimer, RoundRobinScheduler};
