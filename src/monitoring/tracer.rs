/*!
 * Structured Tracing
 * Log output for the scheduler using the tracing crate
 *
 * Logs go to stderr so they never interleave with the jobs' stdout.
 */

use tracing::info;
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Default filter when RUST_LOG is unset
const DEFAULT_FILTER: &str = "info";

/// Filter from RUST_LOG, falling back to `info`
pub fn tracing_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - RR_SCHED_TRACE_JSON: Enable JSON output (read into `json` by the caller)
///
/// Calling this more than once is harmless; later calls leave the first subscriber in place.
pub fn init_tracing(json: bool) {
    let registry = tracing_subscriber::registry().with(tracing_filter());

    let installed = if json {
        // JSON output for production/parsing
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        // Human-readable output for development
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_span_events(FmtSpan::NONE)
                    .compact(),
            )
            .try_init()
    };

    if installed.is_ok() {
        info!(json, "Structured tracing initialized");
    }
}
