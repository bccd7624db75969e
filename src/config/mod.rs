/*!
 * Configuration Module
 * Command-line parsing into job specifications, plus environment settings
 */

mod parser;
mod types;

pub use parser::{parse_args, USAGE};
pub use types::{
    candidates_for, ConfigError, ConfigResult, JobSpec, ReportFormat, RuntimeSettings,
    SchedulerConfig,
};
