//! Terminal output summary plugin and its process entrypoint.
//!
//! This crate implements a one-shot plugin compatible with
//! `speakline-plugins`. The plugin reads exactly one JSONL request from
//! stdin, summarises the screen lines it carries, and writes one JSONL
//! response to stdout.

pub mod settings;
pub mod telemetry;

#[cfg(test)]
mod tests;

use std::ffi::OsString;
use std::io::{BufRead, Write};

use speakline_plugins::dispatch::{ExitStatus, serve, serve_failure};
use speakline_plugins::{AnalysisError, Analyzer, DispatchError};
use thiserror::Error;
use tracing::debug;

use crate::settings::{Invocation, Settings};

/// Tracing target for the summary plugin.
const SUMMARY_TARGET: &str = "speakline_plugin_summary";

/// Case-insensitive marker counted by [`LineSummary`].
pub const ERROR_MARKER: &str = "error";

/// Analyzer that reports line counts, the last command, and error lines.
///
/// # Example
///
/// ```
/// use speakline_plugin_summary::LineSummary;
/// use speakline_plugins::Analyzer;
///
/// let lines = vec![String::from("$ ls"), String::from("file1"), String::new()];
/// let speak = LineSummary.analyze(&lines, Some("ls")).expect("analysis");
/// assert_eq!(speak, ["Found 2 non-empty lines", "Last command was: ls"]);
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct LineSummary;

impl Analyzer for LineSummary {
    fn analyze(
        &self,
        lines: &[String],
        last_command: Option<&str>,
    ) -> Result<Vec<String>, AnalysisError> {
        Ok(summarise(lines, last_command))
    }
}

/// Builds the summary utterances for one batch of lines.
#[must_use]
pub fn summarise(lines: &[String], last_command: Option<&str>) -> Vec<String> {
    let non_empty = lines.iter().filter(|line| !line.trim().is_empty()).count();
    let mut speak = vec![format!("Found {non_empty} non-empty lines")];

    if let Some(command) = last_command.filter(|command| !command.is_empty()) {
        speak.push(format!("Last command was: {command}"));
    }

    let error_lines = lines
        .iter()
        .filter(|line| line.to_lowercase().contains(ERROR_MARKER))
        .count();
    if error_lines > 0 {
        speak.push(format!(
            "Found {error_lines} lines containing '{ERROR_MARKER}'"
        ));
    }

    speak
}

/// Errors that leave the plugin unable to answer on stdout.
#[derive(Debug, Error)]
pub enum RunError {
    /// The response could not be written.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    /// Help or version text could not be written.
    #[error("failed to write usage information: {source}")]
    Inform {
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Runs one plugin invocation with the given process arguments.
///
/// Invalid settings and telemetry failures are answered with a failure
/// response, like any protocol error, so the host is never left without a
/// response line.
///
/// # Errors
///
/// Returns a [`RunError`] only if nothing can be written to `stdout`.
pub fn run<I, T>(
    args: I,
    stdin: &mut impl BufRead,
    stdout: &mut impl Write,
) -> Result<ExitStatus, RunError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let settings = match Settings::load_from_iter(args) {
        Ok(Invocation::Serve(settings)) => settings,
        Ok(Invocation::Inform(text)) => {
            stdout
                .write_all(text.as_bytes())
                .and_then(|()| stdout.flush())
                .map_err(|source| RunError::Inform { source })?;
            return Ok(ExitStatus::Success);
        }
        Err(error) => return Ok(serve_failure(stdout, &error)?),
    };

    if let Err(error) = telemetry::initialise(&settings) {
        return Ok(serve_failure(stdout, &error)?);
    }

    let status = serve(stdin, stdout, &LineSummary)?;
    debug!(target: SUMMARY_TARGET, ?status, "plugin invocation finished");
    Ok(status)
}
