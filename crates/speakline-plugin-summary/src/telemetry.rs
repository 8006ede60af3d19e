//! Structured telemetry initialisation for the plugin process.
//!
//! Diagnostics go to stderr only. Stdout belongs to the protocol and must
//! carry nothing but the single response line.

use std::io::{self, IsTerminal};
use std::panic;

use once_cell::sync::OnceCell;
use tracing::{Subscriber, error, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use crate::settings::{LogFormat, Settings};

/// Tracing target for panic reports.
const PANIC_TARGET: &str = "speakline_plugin_summary::panic";

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Handle returned when telemetry has been initialised.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Configures the global tracing subscriber when invoked for the first time.
///
/// Repeated calls are idempotent: only the first invocation installs the
/// global subscriber.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] for an unparseable filter expression and
/// [`TelemetryError::Subscriber`] if another subscriber is already installed.
pub fn initialise(settings: &Settings) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(settings))
        .map(|_| TelemetryHandle)
}

/// Parses the filter expression without installing anything.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] when the expression is invalid.
pub fn build_filter(expression: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(expression).map_err(|error| TelemetryError::Filter(error.to_string()))
}

fn install_subscriber(settings: &Settings) -> Result<(), TelemetryError> {
    let filter = build_filter(settings.log_filter())?;

    let builder = |filter: EnvFilter| {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(io::stderr)
            .with_ansi(io::stderr().is_terminal())
            .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
    };

    let subscriber: Box<dyn Subscriber + Send + Sync> = match settings.log_format() {
        LogFormat::Json => Box::new(builder(filter).json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder(filter).compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}

/// Replaces the default panic hook with a tracing event.
///
/// Panics inside the analyzer are still answered with a failure response;
/// this only keeps the report off raw stderr so it follows the configured
/// filter like every other diagnostic.
pub fn route_panics_to_tracing() {
    panic::set_hook(Box::new(|info| {
        error!(target: PANIC_TARGET, panic = %info, "plugin panicked");
    }));
}
