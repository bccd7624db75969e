/*!
 * Round-Robin Scheduler - Main Entry Point
 *
 * schedule <quantum_ms> prog1 [args...] : prog2 [args...] : ...
 *
 * Launches every program paused, then hands out one quantum at a time in
 * command-line order until all of them have exited.
 */

use miette::IntoDiagnostic;
use rr_scheduler::config::ReportFormat;
use rr_scheduler::{init_tracing, parse_args, RoundRobinScheduler, RuntimeSettings};
use tracing::info;

fn main() -> miette::Result<()> {
    let settings = RuntimeSettings::from_env();
    init_tracing(settings.trace_json);

    let config = parse_args(std::env::args(), settings.prefixes())?;
    info!(
        quantum_ms = config.quantum.as_millis() as u64,
        jobs = config.jobs.len(),
        "Scheduler starting"
    );

    let mut scheduler = RoundRobinScheduler::with_os(config.quantum)?;
    let report = scheduler.run(&config.jobs)?;

    match settings.report {
        ReportFormat::Json => eprintln!("{}", report.to_json().into_diagnostic()?),
        ReportFormat::Log => info!(
            run_id = %report.run_id,
            wall_time_ms = report.wall_time_ms,
            preemptions = report.preemptions,
            "Run complete"
        ),
    }

    Ok(())
}
