//! Host-side plugin execution over child processes.
//!
//! [`SubprocessExecutor`] implements [`PluginExecutor`] by spawning the
//! plugin with piped stdio, writing the request to stdin as a single JSONL
//! line, reading one response line from stdout, and waiting for exit under
//! the manifest's timeout. The exit status decides how the host should treat
//! the response: see [`PluginOutcome`].

use std::io::{self, BufRead, BufReader, Write};
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::PluginError;
use crate::manifest::PluginManifest;
use crate::protocol::{SpeechRequest, SpeechResponse};

/// Tracing target for plugin process operations.
const PLUGIN_TARGET: &str = "speakline_plugins::process";

/// What the host learned from one plugin invocation.
///
/// # Example
///
/// ```
/// use speakline_plugins::{PluginOutcome, SpeechResponse};
///
/// let outcome = PluginOutcome::Failed {
///     status: 1,
///     response: SpeechResponse::failure("plugin request was empty"),
/// };
/// assert!(!outcome.is_success());
/// assert_eq!(outcome.utterances(), ["Plugin error: plugin request was empty"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginOutcome {
    /// The plugin exited with status `0`; its utterances are analysis.
    Completed {
        /// Response written by the plugin.
        response: SpeechResponse,
    },
    /// The plugin exited non-zero but still wrote a response.
    Failed {
        /// Process exit status.
        status: i32,
        /// Response written by the plugin, normally one diagnostic.
        response: SpeechResponse,
    },
}

impl PluginOutcome {
    /// Returns whether the plugin reported success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Returns the response written by the plugin.
    #[must_use]
    pub const fn response(&self) -> &SpeechResponse {
        match self {
            Self::Completed { response } | Self::Failed { response, .. } => response,
        }
    }

    /// Returns what the host should speak.
    ///
    /// A successful plugin's utterances are all returned. A failed plugin's
    /// output is not trusted as analysis, so only its diagnostic, the first
    /// utterance, is returned (or nothing if it wrote none).
    #[must_use]
    pub fn utterances(&self) -> &[String] {
        match self {
            Self::Completed { response } => response.speak(),
            Self::Failed { response, .. } => response.speak().get(..1).unwrap_or(&[]),
        }
    }
}

/// Trait abstracting plugin process execution for testability.
///
/// The production implementation is [`SubprocessExecutor`]. Test code can
/// implement this trait to inject pre-configured outcomes.
///
/// # Example
///
/// ```
/// use speakline_plugins::{
///     PluginError, PluginExecutor, PluginManifest, PluginOutcome, SpeechRequest, SpeechResponse,
/// };
///
/// struct CannedExecutor;
///
/// impl PluginExecutor for CannedExecutor {
///     fn execute(
///         &self,
///         _manifest: &PluginManifest,
///         _request: &SpeechRequest,
///     ) -> Result<PluginOutcome, PluginError> {
///         Ok(PluginOutcome::Completed {
///             response: SpeechResponse::success(vec!["done".into()]),
///         })
///     }
/// }
/// ```
pub trait PluginExecutor {
    /// Runs the plugin described by the manifest with the given request.
    ///
    /// # Errors
    ///
    /// Returns a [`PluginError`] if the plugin cannot be spawned, times out,
    /// or produces no usable response.
    fn execute(
        &self,
        manifest: &PluginManifest,
        request: &SpeechRequest,
    ) -> Result<PluginOutcome, PluginError>;
}

/// Executes plugins as child processes of the host.
///
/// # Example
///
/// ```rust,no_run
/// use speakline_plugins::{PluginExecutor, PluginManifest, SpeechRequest, SubprocessExecutor};
/// use std::path::PathBuf;
///
/// let manifest = PluginManifest::new("summary", PathBuf::from("/usr/bin/speakline-summary"));
/// let request = SpeechRequest::new(vec!["$ ls".into()]).with_last_command("ls");
/// let outcome = SubprocessExecutor.execute(&manifest, &request);
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct SubprocessExecutor;

impl PluginExecutor for SubprocessExecutor {
    fn execute(
        &self,
        manifest: &PluginManifest,
        request: &SpeechRequest,
    ) -> Result<PluginOutcome, PluginError> {
        manifest.validate()?;
        if !manifest.executable().exists() {
            return Err(PluginError::ExecutableNotFound {
                name: manifest.name().to_owned(),
                path: manifest.executable().to_path_buf(),
            });
        }

        let mut child = spawn(manifest)?;
        let result = exchange(manifest, &mut child, request);
        if result.is_err() {
            reap(&mut child);
        }
        result
    }
}

/// Spawns the plugin with all three standard streams piped.
fn spawn(manifest: &PluginManifest) -> Result<Child, PluginError> {
    let name = manifest.name();
    debug!(
        target: PLUGIN_TARGET,
        plugin = name,
        executable = %manifest.executable().display(),
        "spawning plugin process"
    );

    Command::new(manifest.executable())
        .args(manifest.args())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| PluginError::SpawnFailed {
            name: name.to_owned(),
            message: err.to_string(),
            source: Some(Arc::new(err)),
        })
}

/// Performs the request/response exchange with a running plugin.
///
/// Stdin, stdout, and stderr are each serviced on their own thread so a
/// plugin that floods stderr, never reads its request, or never answers
/// cannot stall the host past the manifest deadline.
fn exchange(
    manifest: &PluginManifest,
    child: &mut Child,
    request: &SpeechRequest,
) -> Result<PluginOutcome, PluginError> {
    let name = manifest.name();
    let timeout_secs = manifest.timeout_secs();
    let deadline = Instant::now()
        .checked_add(Duration::from_secs(timeout_secs))
        .ok_or_else(|| PluginError::Manifest {
            message: format!("plugin '{name}' timeout of {timeout_secs}s is too large"),
        })?;

    let stdin = child.stdin.take().ok_or_else(|| PluginError::SpawnFailed {
        name: name.to_owned(),
        message: String::from("failed to capture stdin"),
        source: None,
    })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| PluginError::SpawnFailed {
            name: name.to_owned(),
            message: String::from("failed to capture stdout"),
            source: None,
        })?;

    if let Some(stderr) = child.stderr.take() {
        drain_stderr(name, stderr)?;
    }
    let responses = read_response(name, stdout)?;
    let written = write_request(name, stdin, request)?;

    let response_line = await_response(name, &responses, deadline, timeout_secs)?;
    let status = wait_for_exit(name, child, deadline, timeout_secs)?;
    await_request_written(name, &written, deadline)?;
    interpret(name, status, &response_line)
}

/// Serialises the request and writes it to the plugin's stdin on a helper
/// thread, closing the pipe once the line is flushed.
fn write_request(
    name: &str,
    mut stdin: ChildStdin,
    request: &SpeechRequest,
) -> Result<Receiver<io::Result<()>>, PluginError> {
    let mut json = serde_json::to_string(request).map_err(PluginError::SerializeRequest)?;
    json.push('\n');

    debug!(
        target: PLUGIN_TARGET,
        plugin = name,
        request_bytes = json.len(),
        lines = request.lines().len(),
        "writing request to plugin stdin"
    );

    let (sender, receiver) = mpsc::channel();
    spawn_helper(name, "stdin", move || {
        let result = stdin
            .write_all(json.as_bytes())
            .and_then(|()| stdin.flush());
        drop(stdin);
        drop(sender.send(result));
    })?;
    Ok(receiver)
}

/// Reads a single JSONL line from the plugin's stdout on a helper thread.
///
/// The line arrives as an empty string when the plugin closes stdout
/// without writing.
fn read_response(
    name: &str,
    stdout: ChildStdout,
) -> Result<Receiver<io::Result<String>>, PluginError> {
    let (sender, receiver) = mpsc::channel();
    spawn_helper(name, "stdout", move || {
        let mut line = String::new();
        let result = BufReader::new(stdout)
            .read_line(&mut line)
            .map(|_| line);
        drop(sender.send(result));
    })?;
    Ok(receiver)
}

/// Forwards stderr to the debug log until the plugin closes it; it is not
/// part of the protocol.
fn drain_stderr(name: &str, stderr: ChildStderr) -> Result<(), PluginError> {
    let plugin = name.to_owned();
    spawn_helper(name, "stderr", move || {
        let mut reader = BufReader::new(stderr);
        let mut buffer = Vec::new();
        // Bytes, not `lines()`: invalid UTF-8 must not stop the drain.
        while matches!(reader.read_until(b'\n', &mut buffer), Ok(read) if read > 0) {
            debug!(
                target: PLUGIN_TARGET,
                plugin = %plugin,
                stderr = %String::from_utf8_lossy(&buffer).trim_end(),
                "plugin stderr output"
            );
            buffer.clear();
        }
    })
}

fn spawn_helper(
    name: &str,
    stream: &str,
    work: impl FnOnce() + Send + 'static,
) -> Result<(), PluginError> {
    thread::Builder::new()
        .name(format!("plugin-{name}-{stream}"))
        .spawn(work)
        .map(drop)
        .map_err(|err| PluginError::Io {
            name: name.to_owned(),
            source: Arc::new(err),
        })
}

/// Waits for the response line until the deadline passes.
fn await_response(
    name: &str,
    responses: &Receiver<io::Result<String>>,
    deadline: Instant,
    timeout_secs: u64,
) -> Result<String, PluginError> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    match responses.recv_timeout(remaining) {
        Ok(Ok(line)) => {
            debug!(
                target: PLUGIN_TARGET,
                plugin = name,
                bytes_read = line.len(),
                "read response from plugin stdout"
            );
            Ok(line)
        }
        Ok(Err(err)) => Err(PluginError::Io {
            name: name.to_owned(),
            source: Arc::new(err),
        }),
        Err(RecvTimeoutError::Timeout) => {
            warn!(
                target: PLUGIN_TARGET,
                plugin = name,
                timeout_secs,
                "plugin did not answer before the deadline"
            );
            Err(PluginError::Timeout {
                name: name.to_owned(),
                timeout_secs,
            })
        }
        Err(RecvTimeoutError::Disconnected) => Err(PluginError::InvalidOutput {
            name: name.to_owned(),
            message: String::from("stdout reader stopped without a result"),
        }),
    }
}

/// Reports a failed request write once the plugin has exited.
///
/// A plugin may answer without consuming its request, so a closed pipe is
/// only logged. A writer still blocked at the deadline is abandoned.
fn await_request_written(
    name: &str,
    written: &Receiver<io::Result<()>>,
    deadline: Instant,
) -> Result<(), PluginError> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    match written.recv_timeout(remaining) {
        Ok(Err(err)) if err.kind() == io::ErrorKind::BrokenPipe => {
            debug!(
                target: PLUGIN_TARGET,
                plugin = name,
                "plugin exited without reading its request"
            );
            Ok(())
        }
        Ok(Err(err)) => Err(PluginError::Io {
            name: name.to_owned(),
            source: Arc::new(err),
        }),
        Ok(Ok(())) | Err(_) => Ok(()),
    }
}

/// Waits for the child process to exit before the deadline.
///
/// Returns the exit code, or `-1` when the process was killed by a signal.
fn wait_for_exit(
    name: &str,
    child: &mut Child,
    deadline: Instant,
    timeout_secs: u64,
) -> Result<i32, PluginError> {
    let poll_interval = Duration::from_millis(20);

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                debug!(
                    target: PLUGIN_TARGET,
                    plugin = name,
                    ?status,
                    "plugin process exited"
                );
                return Ok(status.code().unwrap_or(-1));
            }
            Ok(None) => {
                if Instant::now() >= deadline {
                    warn!(
                        target: PLUGIN_TARGET,
                        plugin = name,
                        timeout_secs,
                        "plugin timed out, killing process"
                    );
                    return Err(PluginError::Timeout {
                        name: name.to_owned(),
                        timeout_secs,
                    });
                }
                thread::sleep(poll_interval);
            }
            Err(err) => {
                return Err(PluginError::Io {
                    name: name.to_owned(),
                    source: Arc::new(err),
                });
            }
        }
    }
}

/// Maps the exit status and response line onto a [`PluginOutcome`].
fn interpret(name: &str, status: i32, line: &str) -> Result<PluginOutcome, PluginError> {
    let trimmed = line.trim();

    if status != 0 {
        return serde_json::from_str::<SpeechResponse>(trimmed)
            .map(|response| PluginOutcome::Failed { status, response })
            .map_err(|_| PluginError::NonZeroExit {
                name: name.to_owned(),
                status,
            });
    }

    if trimmed.is_empty() {
        return Err(PluginError::InvalidOutput {
            name: name.to_owned(),
            message: String::from("plugin produced no output on stdout"),
        });
    }

    serde_json::from_str::<SpeechResponse>(trimmed)
        .map(|response| PluginOutcome::Completed { response })
        .map_err(|err| PluginError::DeserializeResponse {
            message: format!("plugin '{name}' produced invalid JSON: {err}"),
            source: Some(err),
        })
}

/// Kills and reaps a child whose exchange failed.
fn reap(child: &mut Child) {
    drop(child.kill());
    drop(child.wait());
}
