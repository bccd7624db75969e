/*!
 * Monitoring Module
 * Structured tracing setup and the end-of-run report
 */

pub mod report;
pub mod tracer;

pub use report::{DispatchRecord, Phase, RunReport, SliceOutcome};
pub use tracer::{init_tracing, tracing_filter};
