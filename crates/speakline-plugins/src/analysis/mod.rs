//! Analyzer capability plugged in behind the protocol.
//!
//! An [`Analyzer`] turns a batch of screen lines (and the last command, when
//! known) into the utterances to speak. It owns no I/O: decoding the request
//! and writing the response are the job of [`crate::dispatch`]. Any closure
//! with the matching shape is an analyzer, so a plugin can be as small as a
//! single function.

use thiserror::Error;

/// Analysis capability invoked once per plugin process.
///
/// # Example
///
/// ```
/// use speakline_plugins::{AnalysisError, Analyzer};
///
/// struct LineCount;
///
/// impl Analyzer for LineCount {
///     fn analyze(
///         &self,
///         lines: &[String],
///         _last_command: Option<&str>,
///     ) -> Result<Vec<String>, AnalysisError> {
///         Ok(vec![format!("{} lines", lines.len())])
///     }
/// }
///
/// let speak = LineCount.analyze(&[String::from("a")], None).expect("analysis");
/// assert_eq!(speak, vec![String::from("1 lines")]);
/// ```
pub trait Analyzer {
    /// Produces the utterances for one batch of lines, in speaking order.
    ///
    /// # Errors
    ///
    /// Returns an [`AnalysisError`] when the lines cannot be analysed. The
    /// dispatcher converts it into a failure response.
    fn analyze(
        &self,
        lines: &[String],
        last_command: Option<&str>,
    ) -> Result<Vec<String>, AnalysisError>;
}

impl<F> Analyzer for F
where
    F: Fn(&[String], Option<&str>) -> Result<Vec<String>, AnalysisError>,
{
    fn analyze(
        &self,
        lines: &[String],
        last_command: Option<&str>,
    ) -> Result<Vec<String>, AnalysisError> {
        self(lines, last_command)
    }
}

/// Errors raised by analyzer implementations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnalysisError {
    /// The analyzer rejected its input.
    #[error("analysis failed: {message}")]
    Failed {
        /// Human-readable failure description.
        message: String,
    },
    /// The analyzer panicked; the panic payload is kept when it was text.
    #[error("analysis panicked: {message}")]
    Panicked {
        /// Panic message, or a placeholder for non-text payloads.
        message: String,
    },
}

impl AnalysisError {
    /// Creates a [`AnalysisError::Failed`] from any displayable message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}
