//! Host-side description of a plugin executable.
//!
//! A [`PluginManifest`] records what the host needs to launch a plugin: the
//! name it reports in diagnostics, the executable and its arguments, and the
//! timeout after which the host gives up and kills the process. How plugins
//! are discovered or bound to keys is the host's business; the manifest only
//! describes one that has already been chosen.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::PluginError;

/// Default timeout in seconds for plugin execution.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Launch description for one plugin.
///
/// # Example
///
/// ```
/// use speakline_plugins::PluginManifest;
/// use std::path::PathBuf;
///
/// let manifest = PluginManifest::new("summary", PathBuf::from("/usr/bin/python3"))
///     .with_args(vec!["/usr/share/speakline/plugins/summary.py".into()]);
///
/// assert_eq!(manifest.name(), "summary");
/// assert_eq!(manifest.timeout_secs(), 30);
/// assert!(manifest.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    name: String,
    executable: PathBuf,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl PluginManifest {
    /// Creates a manifest with the default timeout and no arguments.
    #[must_use]
    pub fn new(name: impl Into<String>, executable: PathBuf) -> Self {
        Self {
            name: name.into(),
            executable,
            args: Vec::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Sets the arguments passed to the plugin executable.
    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Overrides the default timeout.
    #[must_use]
    pub const fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Validates the manifest, returning an error if it is malformed.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Manifest`] if the name is empty, the executable
    /// path is not absolute, or the timeout is zero.
    pub fn validate(&self) -> Result<(), PluginError> {
        if self.name.trim().is_empty() {
            return Err(PluginError::Manifest {
                message: String::from("plugin name must not be empty"),
            });
        }
        if !self.executable.is_absolute() {
            return Err(PluginError::Manifest {
                message: format!(
                    "plugin executable must be an absolute path, got '{}'",
                    self.executable.display()
                ),
            });
        }
        if self.timeout_secs == 0 {
            return Err(PluginError::Manifest {
                message: format!("plugin '{}' timeout must be at least one second", self.name),
            });
        }
        Ok(())
    }

    /// Returns the plugin name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the absolute path to the plugin executable.
    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Returns the arguments passed to the executable.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Returns the timeout in seconds.
    #[must_use]
    pub const fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }
}

#[cfg(test)]
mod tests;
