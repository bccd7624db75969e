/*!
 * Core Types
 * Common types used across the scheduler
 */

/// OS-level process handle
pub use nix::unistd::Pid;

/// Index of a job in specification (and launch) order
pub type JobIndex = usize;

/// Common result type for scheduler operations
pub type SchedulerResult<T> = Result<T, super::errors::SchedulerError>;
