//! Command-line and environment settings for the summary plugin.
//!
//! The host normally launches the plugin without arguments, so every setting
//! has a default and may also come from the environment. Settings only
//! affect diagnostics on stderr; they never change what is spoken.

use std::ffi::OsString;

use clap::{Parser, ValueEnum};
use thiserror::Error;

/// Default log filter: the plugin stays silent outside the protocol.
pub const DEFAULT_LOG_FILTER: &str = "off";

/// Supported logging output formats.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable single line output.
    #[default]
    Compact,
    /// Structured JSON suitable for ingestion by logging stacks.
    Json,
}

/// Settings for one plugin invocation.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(
    name = "speakline-summary",
    version,
    about = "Summarises terminal output for the Speakline screen reader",
    long_about = "Reads one JSON request from stdin and writes one JSON response to stdout."
)]
pub struct Settings {
    /// Tracing filter for diagnostics written to stderr.
    #[arg(long, env = "SPEAKLINE_LOG", default_value = DEFAULT_LOG_FILTER)]
    log_filter: String,
    /// Format of diagnostics written to stderr.
    #[arg(long, env = "SPEAKLINE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_filter: String::from(DEFAULT_LOG_FILTER),
            log_format: LogFormat::default(),
        }
    }
}

/// Result of interpreting the command line.
#[derive(Debug)]
pub enum Invocation {
    /// Serve one request with these settings.
    Serve(Settings),
    /// Print this text (help or version) and exit successfully.
    Inform(String),
}

/// Errors raised while reading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The command line or environment held an invalid value.
    #[error("invalid plugin settings: {message}")]
    Invalid {
        /// First line of the parser's report.
        message: String,
    },
}

impl Settings {
    /// Parses settings from process arguments and the environment.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] for unknown flags or bad values.
    pub fn load_from_iter<I, T>(args: I) -> Result<Invocation, SettingsError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        match Self::try_parse_from(args) {
            Ok(settings) => Ok(Invocation::Serve(settings)),
            Err(error) => match error.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                    Ok(Invocation::Inform(error.to_string()))
                }
                _ => Err(SettingsError::Invalid {
                    message: summarise_clap_error(&error),
                }),
            },
        }
    }

    /// Returns the tracing filter expression.
    #[must_use]
    pub const fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Returns the diagnostic output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

fn summarise_clap_error(error: &clap::Error) -> String {
    let rendered = error.to_string();
    rendered
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map_or_else(
            || String::from("unrecognised arguments"),
            |line| line.trim_start_matches("error: ").to_owned(),
        )
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn no_arguments_use_defaults() {
        let Ok(Invocation::Serve(settings)) = Settings::load_from_iter(["speakline-summary"]) else {
            panic!("expected settings");
        };
        assert_eq!(settings.log_format(), LogFormat::Compact);
        assert!(!settings.log_filter().is_empty());
    }

    #[rstest]
    #[case::compact("compact", LogFormat::Compact)]
    #[case::json("json", LogFormat::Json)]
    fn log_format_flag_is_parsed(#[case] value: &str, #[case] expected: LogFormat) {
        let args = ["speakline-summary", "--log-format", value];
        let Ok(Invocation::Serve(settings)) = Settings::load_from_iter(args) else {
            panic!("expected settings");
        };
        assert_eq!(settings.log_format(), expected);
    }

    #[test]
    fn log_filter_flag_is_parsed() {
        let args = ["speakline-summary", "--log-filter", "speakline_plugins=debug"];
        let Ok(Invocation::Serve(settings)) = Settings::load_from_iter(args) else {
            panic!("expected settings");
        };
        assert_eq!(settings.log_filter(), "speakline_plugins=debug");
    }

    #[rstest]
    #[case::unknown_flag(&["speakline-summary", "--bogus"])]
    #[case::bad_format(&["speakline-summary", "--log-format", "xml"])]
    #[case::stray_positional(&["speakline-summary", "extra"])]
    fn invalid_arguments_are_rejected(#[case] args: &[&str]) {
        let err = Settings::load_from_iter(args.iter().copied()).expect_err("should fail");
        let message = err.to_string();
        assert!(message.starts_with("invalid plugin settings"), "got: {message}");
        assert!(!message.contains('\n'), "message should be one line: {message}");
    }

    #[rstest]
    #[case::help("--help")]
    #[case::version("--version")]
    fn informational_flags_are_not_errors(#[case] flag: &str) {
        let invocation = Settings::load_from_iter(["speakline-summary", flag]).expect("inform");
        assert!(matches!(invocation, Invocation::Inform(text) if !text.is_empty()));
    }
}
