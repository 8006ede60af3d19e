//! Domain errors raised on both sides of the plugin protocol.
//!
//! All errors use `thiserror`-derived enums with structured context so callers
//! can inspect the failure programmatically. I/O errors held by the host-side
//! [`PluginError`] are wrapped in `Arc` to satisfy the `result_large_err`
//! Clippy lint and keep the error `Send + Sync`.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::analysis::AnalysisError;

/// Failures between reading the request and encoding the response.
///
/// Every variant is converted into a failure response by
/// [`crate::dispatch::serve`]; none of them reach the host as silence.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Reading the request line from stdin failed.
    #[error("failed to read request: {source}")]
    Read {
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Stdin was closed, or the request line held no data.
    #[error("plugin request was empty")]
    EmptyInput,
    /// The request line was not valid JSON.
    #[error("invalid request JSON: {source}")]
    InvalidJson {
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
    /// The request line was JSON, but not an object.
    #[error("plugin request must be a JSON object, got {found}")]
    NotAnObject {
        /// JSON type that was found instead.
        found: &'static str,
    },
    /// The request object did not match the request schema.
    #[error("invalid plugin request: {source}")]
    InvalidRequest {
        /// Underlying schema error.
        #[source]
        source: serde_json::Error,
    },
    /// The analyzer failed or panicked.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    /// The analysis result could not be serialized.
    #[error("failed to encode plugin response: {source}")]
    Encode {
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },
}

/// Errors that prevent any response from reaching the host.
///
/// Only stdout failures land here: once the response line cannot be written
/// the protocol has no channel left to report through.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Writing the response to stdout failed.
    #[error("failed to write plugin response: {source}")]
    Write {
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Serializing the failure response failed.
    #[error("failed to serialize plugin response: {source}")]
    Serialize {
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },
}

/// Errors arising while the host runs a plugin process.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The plugin process could not be spawned.
    #[error("plugin '{name}' failed to start: {message}")]
    SpawnFailed {
        /// Plugin name.
        name: String,
        /// Human-readable failure description.
        message: String,
        /// Optional underlying I/O error.
        #[source]
        source: Option<Arc<std::io::Error>>,
    },

    /// The plugin did not complete within the configured timeout.
    #[error("plugin '{name}' timed out after {timeout_secs}s")]
    Timeout {
        /// Plugin name.
        name: String,
        /// Configured timeout in seconds.
        timeout_secs: u64,
    },

    /// The plugin exited non-zero without a usable response.
    #[error("plugin '{name}' exited with non-zero status {status}")]
    NonZeroExit {
        /// Plugin name.
        name: String,
        /// Process exit status, or `-1` when killed by a signal.
        status: i32,
    },

    /// The request could not be serialized to JSON.
    #[error("failed to serialise plugin request: {0}")]
    SerializeRequest(#[source] serde_json::Error),

    /// The response could not be deserialized from JSON.
    #[error("failed to deserialise plugin response: {message}")]
    DeserializeResponse {
        /// Human-readable description of the parse failure.
        message: String,
        /// Optional underlying JSON error.
        #[source]
        source: Option<serde_json::Error>,
    },

    /// The plugin produced output that does not conform to the protocol.
    #[error("plugin '{name}' wrote invalid output: {message}")]
    InvalidOutput {
        /// Plugin name.
        name: String,
        /// Description of the protocol violation.
        message: String,
    },

    /// An I/O error occurred while communicating with the plugin process.
    #[error("I/O error communicating with plugin '{name}': {source}")]
    Io {
        /// Plugin name.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// A plugin manifest failed validation.
    #[error("manifest error: {message}")]
    Manifest {
        /// Description of the validation failure.
        message: String,
    },

    /// The plugin executable was not found on the filesystem.
    #[error("plugin '{name}' executable not found: {path}")]
    ExecutableNotFound {
        /// Plugin name.
        name: String,
        /// Path that was checked.
        path: PathBuf,
    },
}
