//! Speech plugin protocol for the Speakline terminal screen reader.
//!
//! The `speakline-plugins` crate implements the contract between the screen
//! reader (the host) and external analyzers (plugins). Plugins are
//! short-lived processes that communicate with the host via a single-line
//! JSONL protocol over standard I/O: the host writes one [`SpeechRequest`]
//! holding recently displayed terminal lines, the plugin answers with one
//! [`SpeechResponse`] listing the utterances to vocalize, and the exit status
//! tells the host whether the utterances can be trusted.
//!
//! # Architecture
//!
//! The plugin side lives in [`dispatch`]: [`dispatch::serve`] decodes the
//! request, hands it to an [`Analyzer`] capability, and encodes exactly one
//! response. Every failure along the way is threaded through one `Result`
//! chain and converted into a failure response at a single point, so a
//! plugin never answers with silence.
//!
//! The host side lives in [`process`]: [`process::SubprocessExecutor`]
//! spawns a plugin described by a [`PluginManifest`], performs the exchange,
//! and maps the exit status into a [`PluginOutcome`].
//!
//! # Example
//!
//! ```
//! use std::io::Cursor;
//!
//! use speakline_plugins::dispatch::{ExitStatus, serve};
//! use speakline_plugins::AnalysisError;
//!
//! let analyzer = |lines: &[String], _last: Option<&str>| -> Result<Vec<String>, AnalysisError> {
//!     Ok(vec![format!("{} lines", lines.len())])
//! };
//!
//! let mut stdin = Cursor::new(b"{\"lines\": [\"a\", \"b\"]}\n".to_vec());
//! let mut stdout = Vec::new();
//! let status = serve(&mut stdin, &mut stdout, &analyzer).expect("stdout is writable");
//!
//! assert_eq!(status, ExitStatus::Success);
//! assert_eq!(stdout, b"{\"speak\":[\"2 lines\"]}\n");
//! ```

pub mod analysis;
pub mod dispatch;
pub mod error;
pub mod manifest;
pub mod process;
pub mod protocol;

#[cfg(test)]
mod tests;

pub use self::analysis::{AnalysisError, Analyzer};
pub use self::dispatch::{ExitStatus, serve};
pub use self::error::{DispatchError, PluginError, ProtocolError};
pub use self::manifest::PluginManifest;
pub use self::process::{PluginExecutor, PluginOutcome, SubprocessExecutor};
pub use self::protocol::{FAILURE_PREFIX, SpeechRequest, SpeechResponse};
