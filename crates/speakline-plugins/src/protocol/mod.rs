//! Wire types for host-plugin communication.
//!
//! The protocol is a single-line JSONL exchange over stdio. The host writes
//! one [`SpeechRequest`] line to the plugin's stdin. The plugin writes one
//! [`SpeechResponse`] line to stdout and exits; the exit status tells the
//! host whether the response carries analysis (`0`) or a diagnostic
//! (non-zero). Plugin stderr is not part of the protocol.

use serde::{Deserialize, Serialize};

/// Prefix marking a failure utterance as plugin-originated.
pub const FAILURE_PREFIX: &str = "Plugin error: ";

/// Request sent from the host to a plugin on stdin.
///
/// `lines` holds the screen lines from the bottom of the display upwards,
/// stopping at the prompt boundary. Both fields are optional on the wire:
/// a missing `lines` decodes to an empty sequence and a missing (or `null`)
/// `last_command` decodes to `None`, which is distinct from
/// `Some(String::new())`.
///
/// # Example
///
/// ```
/// use speakline_plugins::SpeechRequest;
///
/// let request: SpeechRequest = serde_json::from_str("{}").expect("valid request");
/// assert!(request.lines().is_empty());
/// assert_eq!(request.last_command(), None);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpeechRequest {
    #[serde(default)]
    lines: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_command: Option<String>,
}

impl SpeechRequest {
    /// Creates a request without command context.
    #[must_use]
    pub const fn new(lines: Vec<String>) -> Self {
        Self {
            lines,
            last_command: None,
        }
    }

    /// Attaches the last shell command to the request.
    #[must_use]
    pub fn with_last_command(mut self, command: impl Into<String>) -> Self {
        self.last_command = Some(command.into());
        self
    }

    /// Returns the screen lines, bottom first.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Returns the last command, if the host knew one.
    #[must_use]
    pub fn last_command(&self) -> Option<&str> {
        self.last_command.as_deref()
    }
}

/// Response sent from a plugin to the host on stdout.
///
/// The `speak` field is always present, on success and on failure alike.
/// Whether the utterances are analysis or a diagnostic is signalled by the
/// process exit status, not by the record itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpeechResponse {
    speak: Vec<String>,
}

impl SpeechResponse {
    /// Creates a response carrying the utterances to speak, in order.
    #[must_use]
    pub const fn success(speak: Vec<String>) -> Self {
        Self { speak }
    }

    /// Creates a response carrying exactly one prefixed diagnostic.
    ///
    /// # Example
    ///
    /// ```
    /// use speakline_plugins::SpeechResponse;
    ///
    /// let response = SpeechResponse::failure("plugin request was empty");
    /// assert_eq!(response.speak(), ["Plugin error: plugin request was empty"]);
    /// ```
    #[must_use]
    pub fn failure(diagnostic: impl std::fmt::Display) -> Self {
        Self {
            speak: vec![format!("{FAILURE_PREFIX}{diagnostic}")],
        }
    }

    /// Returns the utterances in speaking order.
    #[must_use]
    pub fn speak(&self) -> &[String] {
        &self.speak
    }

    /// Consumes the response, returning the utterances.
    #[must_use]
    pub fn into_speak(self) -> Vec<String> {
        self.speak
    }
}
