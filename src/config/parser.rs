/*!
 * Command-Line Parser
 * Turns `schedule <quantum_ms> prog args : prog args ...` into a SchedulerConfig
 */

use super::types::{ConfigError, ConfigResult, JobSpec, SchedulerConfig};
use crate::core::limits::{GROUP_SEPARATOR, MAX_ARGUMENTS, MAX_PROCESSES, MIN_QUANTUM};
use std::path::PathBuf;
use std::time::Duration;

/// Usage text shown with every configuration error
pub const USAGE: &str = "Usage: schedule <quantum_ms> prog1 [args...] : prog2 [args...] : ...";

/// Parse a full argument vector (including the binary name at position 0).
///
/// `prefixes` are the search prefixes used to build each job's candidate list.
pub fn parse_args<I, S>(argv: I, prefixes: &[PathBuf]) -> ConfigResult<SchedulerConfig>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let argv: Vec<String> = argv.into_iter().map(Into::into).collect();
    if argv.len() < 3 {
        return Err(ConfigError::Usage);
    }

    let quantum = parse_quantum(&argv[1])?;

    let groups = split_groups(&argv[2..]);
    if groups.len() > MAX_PROCESSES {
        return Err(ConfigError::TooManyProcesses {
            count: groups.len(),
            limit: MAX_PROCESSES,
        });
    }

    let mut jobs = Vec::with_capacity(groups.len());
    for (position, group) in groups.into_iter().enumerate() {
        let (program, args) = match group.split_first() {
            Some(parts) => parts,
            None => return Err(ConfigError::EmptyGroup(position)),
        };
        if group.len() >= MAX_ARGUMENTS {
            return Err(ConfigError::TooManyArguments {
                program: program.clone(),
                count: group.len(),
                limit: MAX_ARGUMENTS - 1,
            });
        }
        jobs.push(JobSpec::new(program.clone(), args.to_vec(), prefixes));
    }

    Ok(SchedulerConfig { quantum, jobs })
}

fn parse_quantum(raw: &str) -> ConfigResult<Duration> {
    let millis: u64 = raw
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidQuantum(raw.to_string()))?;
    let quantum = Duration::from_millis(millis);
    if quantum < MIN_QUANTUM {
        return Err(ConfigError::InvalidQuantum(raw.to_string()));
    }
    Ok(quantum)
}

/// Split on the separator token. A single trailing separator is dropped;
/// any other empty group is kept so it can be reported.
fn split_groups(tokens: &[String]) -> Vec<&[String]> {
    let tokens = match tokens.split_last() {
        Some((last, rest)) if last == GROUP_SEPARATOR && !rest.is_empty() => rest,
        _ => tokens,
    };
    tokens
        .split(|token| token == GROUP_SEPARATOR)
        .collect()
}
