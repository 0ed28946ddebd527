//! Auditor configuration.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default trail file name.
pub const DEFAULT_TRAIL_PATH: &str = "audit_log.jsonl";

/// Default capacity of the source → auditor channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Default upper bound on a single input line.
pub const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024;

/// Configuration for one auditor run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AuditorConfig {
    /// Where the audit trail is appended.
    pub trail_path: PathBuf,
    /// Optional side file for diagnostics (JSON lines).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics_path: Option<PathBuf>,
    /// Bounded capacity of the event channel.
    pub channel_capacity: usize,
    /// Lines longer than this are rejected as malformed.
    pub max_line_bytes: usize,
}

impl Default for AuditorConfig {
    fn default() -> Self {
        Self {
            trail_path: PathBuf::from(DEFAULT_TRAIL_PATH),
            diagnostics_path: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }
}

impl AuditorConfig {
    /// Creates a config writing the trail to `trail_path`.
    #[must_use]
    pub fn new(trail_path: impl Into<PathBuf>) -> Self {
        Self {
            trail_path: trail_path.into(),
            ..Default::default()
        }
    }

    /// Sets the diagnostics side file.
    #[must_use]
    pub fn with_diagnostics_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.diagnostics_path = Some(path.into());
        self
    }

    /// Sets the channel capacity.
    #[must_use]
    pub const fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Sets the maximum line length.
    #[must_use]
    pub const fn with_max_line_bytes(mut self, max: usize) -> Self {
        self.max_line_bytes = max;
        self
    }

    /// Loads and validates a TOML config file. Missing keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parses and validates a TOML config string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or a value is out of range.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trail_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "trail_path cannot be empty".to_string(),
            ));
        }
        if self
            .diagnostics_path
            .as_deref()
            .is_some_and(|diagnostics| same_file(diagnostics, &self.trail_path))
        {
            return Err(ConfigError::Invalid(
                "diagnostics_path must differ from trail_path".to_string(),
            ));
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "channel_capacity must be at least 1".to_string(),
            ));
        }
        if self.max_line_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_line_bytes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Serializes the config as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Whether two configured paths name the same file.
///
/// Existing files are compared by their canonical path; otherwise both are
/// made absolute and `.`/`..` components are folded.
fn same_file(a: &Path, b: &Path) -> bool {
    if let (Ok(a), Ok(b)) = (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        return a == b;
    }
    normalize(a) == normalize(b)
}

fn normalize(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
