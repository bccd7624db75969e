/*!
 * Scheduler Module
 * Preemption timer and the round-robin scheduling loop
 */

pub mod round_robin;
pub mod timer;

pub use round_robin::RoundRobinScheduler;
pub use timer::{PreemptionTimer, QuantumTimer, TimerError};
