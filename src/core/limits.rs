/*!
 * System Limits and Constants
 *
 * Centralized location for the scheduler's fixed bounds and tunables.
 * Organized by domain for maintainability and discoverability.
 */

use std::time::Duration;

// =============================================================================
// JOB SPECIFICATION LIMITS
// =============================================================================

/// Maximum number of jobs a single run may schedule
pub const MAX_PROCESSES: usize = 100;

/// Argument vector slots per job, including the program name and the
/// terminating null entry. A group of `MAX_ARGUMENTS` tokens or more is rejected.
pub const MAX_ARGUMENTS: usize = 10;

/// Token that separates job groups on the command line
pub const GROUP_SEPARATOR: &str = ":";

/// Search prefixes tried after the program name as typed
pub const DEFAULT_SEARCH_PREFIXES: &[&str] = &["./", "/bin/"];

// =============================================================================
// PROCESS LIMITS
// =============================================================================

/// Exit status of a child that could not start any candidate program
/// [POSIX-COMPAT] Same status a shell reports for "command not found"
pub const LAUNCH_FAILURE_EXIT_CODE: i32 = 127;

/// Conventional exit code offset for jobs terminated by a signal
pub const SIGNAL_EXIT_BASE: i32 = 128;

// =============================================================================
// TIMER LIMITS
// =============================================================================

/// Smallest quantum accepted from the command line
pub const MIN_QUANTUM: Duration = Duration::from_millis(1);

/// Re-notification period after a quantum has expired.
/// The timer keeps firing at this rate until disarmed, so an expiry that lands
/// just before the scheduler blocks is delivered again while it waits.
pub const QUANTUM_RENOTIFY: Duration = Duration::from_millis(5);
