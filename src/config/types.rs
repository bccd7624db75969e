/*!
 * Configuration Types
 * Job specifications and runtime settings handed to the scheduler core
 */

use crate::core::limits::DEFAULT_SEARCH_PREFIXES;
use miette::Diagnostic;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Configuration result
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Command-line configuration errors. All of them are fatal before scheduling starts.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ConfigError {
    #[error("Too few arguments")]
    #[diagnostic(
        code(config::usage),
        help("Usage: schedule <quantum_ms> prog1 [args...] : prog2 [args...] : ...")
    )]
    Usage,

    #[error("Invalid quantum '{0}': expected a positive number of milliseconds")]
    #[diagnostic(
        code(config::invalid_quantum),
        help("Usage: schedule <quantum_ms> prog1 [args...] : prog2 [args...] : ...")
    )]
    InvalidQuantum(String),

    #[error("Empty program group at position {0}")]
    #[diagnostic(
        code(config::empty_group),
        help("Every ':' must separate two programs, e.g. `prog1 a : prog2 b`.")
    )]
    EmptyGroup(usize),

    #[error("Too many arguments for '{program}': {count} given, limit {limit}")]
    #[diagnostic(
        code(config::too_many_arguments),
        help("Each program accepts at most {limit} tokens including its name.")
    )]
    TooManyArguments {
        program: String,
        count: usize,
        limit: usize,
    },

    #[error("Too many processes: {count} given, limit {limit}")]
    #[diagnostic(
        code(config::too_many_processes),
        help("At most {limit} programs can be scheduled in one run.")
    )]
    TooManyProcesses { count: usize, limit: usize },
}

/// One job to schedule: what to run and how to find it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSpec {
    /// Program name as typed
    pub program: String,
    /// Full argument vector, `args[0]` is the program name
    pub args: Vec<String>,
    /// Executable paths tried in order; the first that starts wins
    pub candidates: Vec<PathBuf>,
}

impl JobSpec {
    /// Build a spec whose argument vector is `program` followed by `args`
    pub fn new<S: Into<String>>(program: S, args: Vec<String>, prefixes: &[PathBuf]) -> Self {
        let program = program.into();
        let candidates = candidates_for(&program, prefixes);
        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push(program.clone());
        argv.extend(args);
        Self {
            program,
            args: argv,
            candidates,
        }
    }

    /// Build a spec with an explicit candidate list
    pub fn with_candidates<S: Into<String>>(
        program: S,
        args: Vec<String>,
        candidates: Vec<PathBuf>,
    ) -> Self {
        let mut spec = Self::new(program, args, &[]);
        spec.candidates = candidates;
        spec
    }
}

/// Ordered executable candidates for a program name.
///
/// The name as typed comes first. Bare names are then tried under each
/// search prefix; names that already contain a `/` are explicit paths and are
/// tried verbatim only.
pub fn candidates_for(program: &str, prefixes: &[PathBuf]) -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from(program)];
    if program.contains('/') {
        // No prefix fallback for explicit paths, unlike bare names
        return candidates;
    }
    for prefix in prefixes {
        let candidate = prefix.join(program);
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }
    candidates
}

/// Parsed command line: the quantum and the ordered job list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub quantum: Duration,
    pub jobs: Vec<JobSpec>,
}

/// Where the end-of-run report goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// Summary log line only
    #[default]
    Log,
    /// JSON document on stderr
    Json,
}

/// Environment-driven settings
///
/// Environment variables:
/// - RR_SCHED_PATH_PREFIXES: `:`-separated search prefixes (default: `./:/bin/`)
/// - RR_SCHED_REPORT: `json` to print the run report on stderr
/// - RR_SCHED_TRACE_JSON: enable JSON log output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub search_prefixes: Vec<PathBuf>,
    pub report: ReportFormat,
    pub trace_json: bool,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            search_prefixes: DEFAULT_SEARCH_PREFIXES.iter().map(PathBuf::from).collect(),
            report: ReportFormat::Log,
            trace_json: false,
        }
    }
}

impl RuntimeSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(raw) = lookup("RR_SCHED_PATH_PREFIXES") {
            let prefixes: Vec<PathBuf> = raw
                .split(':')
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
                .collect();
            if !prefixes.is_empty() {
                settings.search_prefixes = prefixes;
            }
        }

        if let Some(raw) = lookup("RR_SCHED_REPORT") {
            if raw.eq_ignore_ascii_case("json") {
                settings.report = ReportFormat::Json;
            }
        }

        settings.trace_json = lookup("RR_SCHED_TRACE_JSON")
            .map(|v| v == "1" || v == "true")
            .unwrap_or(false);

        settings
    }

    pub fn prefixes(&self) -> &[PathBuf] {
        &self.search_prefixes
    }
}
