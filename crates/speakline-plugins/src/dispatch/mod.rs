//! Plugin-side request handling: decode, analyse, encode.
//!
//! A plugin process handles exactly one exchange. [`serve`] reads one request
//! line, runs the [`Analyzer`], and writes one response line. The three steps
//! form a single `Result<_, ProtocolError>` chain; the only place an error is
//! turned into a response is the failure branch of [`serve`], which answers
//! with a one-utterance diagnostic and [`ExitStatus::Failure`].
//!
//! The response is fully encoded before anything is written, so the host
//! sees either one complete line or, if stdout itself is broken, nothing.

use std::any::Any;
use std::fmt::Display;
use std::io::{BufRead, Write};
use std::panic::{self, AssertUnwindSafe};

use tracing::debug;

use crate::analysis::{AnalysisError, Analyzer};
use crate::error::{DispatchError, ProtocolError};
use crate::protocol::{SpeechRequest, SpeechResponse};

/// Tracing target for dispatch operations.
const DISPATCH_TARGET: &str = "speakline_plugins::dispatch";

/// Outcome reported to the host through the process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// The response carries analysis the host may speak as-is.
    Success,
    /// The response carries a single diagnostic.
    Failure,
}

impl ExitStatus {
    /// Returns the numeric process exit code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
        }
    }

    /// Returns `true` for [`ExitStatus::Success`].
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl From<ExitStatus> for std::process::ExitCode {
    fn from(status: ExitStatus) -> Self {
        Self::from(status.code())
    }
}

/// Handles one request from `stdin` and writes one response to `stdout`.
///
/// Decoding, analysis, and encoding failures all produce a failure response
/// and [`ExitStatus::Failure`]; they are not returned as errors.
///
/// # Errors
///
/// Returns a [`DispatchError`] only if the response cannot be written.
pub fn serve<A>(
    stdin: &mut impl BufRead,
    stdout: &mut impl Write,
    analyzer: &A,
) -> Result<ExitStatus, DispatchError>
where
    A: Analyzer + ?Sized,
{
    match respond(stdin, analyzer) {
        Ok(payload) => {
            write_line(stdout, payload)?;
            Ok(ExitStatus::Success)
        }
        Err(error) => serve_failure(stdout, &error),
    }
}

/// Writes a failure response carrying `diagnostic` without reading a request.
///
/// Used when the plugin cannot get as far as decoding, for example when its
/// own settings are invalid.
///
/// # Errors
///
/// Returns a [`DispatchError`] if the response cannot be serialized or
/// written.
pub fn serve_failure(
    stdout: &mut impl Write,
    diagnostic: &impl Display,
) -> Result<ExitStatus, DispatchError> {
    debug!(
        target: DISPATCH_TARGET,
        error = %diagnostic,
        "answering with failure response"
    );
    let payload = serde_json::to_string(&SpeechResponse::failure(diagnostic))
        .map_err(|source| DispatchError::Serialize { source })?;
    write_line(stdout, payload)?;
    Ok(ExitStatus::Failure)
}

/// Reads and validates exactly one request line.
///
/// # Errors
///
/// Returns [`ProtocolError::EmptyInput`] when stdin is closed or the line is
/// blank, [`ProtocolError::Read`] when the line cannot be read as UTF-8,
/// [`ProtocolError::InvalidJson`] or [`ProtocolError::NotAnObject`] when the
/// line is not a JSON object, and [`ProtocolError::InvalidRequest`] when the
/// object's fields have the wrong types.
pub fn decode_request(stdin: &mut impl BufRead) -> Result<SpeechRequest, ProtocolError> {
    let mut line = String::new();
    let bytes_read = stdin
        .read_line(&mut line)
        .map_err(|source| ProtocolError::Read { source })?;

    let trimmed = line.trim();
    if bytes_read == 0 || trimmed.is_empty() {
        return Err(ProtocolError::EmptyInput);
    }

    let value: serde_json::Value =
        serde_json::from_str(trimmed).map_err(|source| ProtocolError::InvalidJson { source })?;
    if !value.is_object() {
        return Err(ProtocolError::NotAnObject {
            found: json_type_name(&value),
        });
    }

    serde_json::from_value(value).map_err(|source| ProtocolError::InvalidRequest { source })
}

/// Runs the analyzer, converting a panic into [`AnalysisError::Panicked`].
///
/// # Errors
///
/// Returns [`ProtocolError::Analysis`] when the analyzer fails or panics.
pub fn run_analysis<A>(analyzer: &A, request: &SpeechRequest) -> Result<Vec<String>, ProtocolError>
where
    A: Analyzer + ?Sized,
{
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        analyzer.analyze(request.lines(), request.last_command())
    }));

    match outcome {
        Ok(result) => result.map_err(ProtocolError::from),
        Err(payload) => Err(ProtocolError::from(AnalysisError::Panicked {
            message: panic_message(&*payload),
        })),
    }
}

/// Serializes a response to a single JSON line without the terminator.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if serialization fails.
pub fn encode_response(response: &SpeechResponse) -> Result<String, ProtocolError> {
    serde_json::to_string(response).map_err(|source| ProtocolError::Encode { source })
}

fn respond<A>(stdin: &mut impl BufRead, analyzer: &A) -> Result<String, ProtocolError>
where
    A: Analyzer + ?Sized,
{
    let request = decode_request(stdin)?;
    debug!(
        target: DISPATCH_TARGET,
        lines = request.lines().len(),
        has_last_command = request.last_command().is_some(),
        "decoded plugin request"
    );

    let speak = run_analysis(analyzer, &request)?;
    debug!(
        target: DISPATCH_TARGET,
        utterances = speak.len(),
        "analysis complete"
    );

    encode_response(&SpeechResponse::success(speak))
}

fn write_line(stdout: &mut impl Write, mut payload: String) -> Result<(), DispatchError> {
    payload.push('\n');
    stdout
        .write_all(payload.as_bytes())
        .map_err(|source| DispatchError::Write { source })?;
    stdout
        .flush()
        .map_err(|source| DispatchError::Write { source })
}

const fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|text| (*text).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| String::from("non-text panic payload"))
}
