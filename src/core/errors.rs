/*!
 * Error Types
 * Top-level error handling with thiserror and miette
 */

use miette::Diagnostic;
use thiserror::Error;

// Re-export layer errors so callers only need `core::errors`
pub use crate::config::ConfigError;
pub use crate::process::ProcessError;
pub use crate::scheduler::TimerError;

/// Errors that abort a scheduling run
#[derive(Error, Debug, Diagnostic)]
pub enum SchedulerError {
    #[error("Process error: {0}")]
    #[diagnostic(
        code(scheduler::process),
        help("A job could not be launched, resumed or waited on. Check system resources and limits.")
    )]
    Process(#[from] ProcessError),

    #[error("Timer error: {0}")]
    #[diagnostic(
        code(scheduler::timer),
        help("The preemption timer could not be created or armed.")
    )]
    Timer(#[from] TimerError),

    #[error("Ring invariant violated: {0}")]
    #[diagnostic(
        code(scheduler::ring_corrupted),
        help("An internal bookkeeping error occurred. Please report this issue.")
    )]
    RingCorrupted(String),
}
