/*!
 * Process Module
 * Process control records, the dispatch ring, launching and OS process control
 */

pub mod control;
pub mod launcher;
pub mod ring;
pub mod types;

// Re-export for convenience
pub use control::{classify, OsProcessControl, ProcessControl};
pub use launcher::JobLauncher;
pub use ring::ProcessRing;
pub use types::{
    ExitStatus, Pcr, ProcessError, ProcessResult, ProcessState, StateChange, WaitEvent,
};
