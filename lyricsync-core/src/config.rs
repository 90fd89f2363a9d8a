use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LyricsyncConfig {
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub interpolation: InterpolationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Thresholds of the live cursor tracker, all in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Position jumps larger than this are seeks
    #[serde(default = "default_seek_threshold")]
    pub seek_threshold_ms: u64,
    /// Window after pause -> play during which jumps are catch-up, not seeks
    #[serde(default = "default_resume_grace")]
    pub resume_grace_ms: u64,
    /// Minimum time between two forward line changes
    #[serde(default = "default_min_dwell")]
    pub min_dwell_ms: u64,
    /// How far before a line's start a forward move may commit
    #[serde(default)]
    pub forward_margin_ms: u64,
    /// How far behind the current line's start the position must fall to move back
    #[serde(default = "default_backward_margin")]
    pub backward_margin_ms: u64,
    /// Reverse deltas below this are position jitter
    #[serde(default = "default_jitter_reverse")]
    pub jitter_reverse_ms: u64,
    #[serde(default = "default_true")]
    pub auto_follow: bool,
}

/// Upper bound accepted for every tracker threshold
pub const MAX_TRACKER_MS: u64 = 60_000;

const fn default_seek_threshold() -> u64 {
    800
}

const fn default_resume_grace() -> u64 {
    1200
}

const fn default_min_dwell() -> u64 {
    120
}

const fn default_backward_margin() -> u64 {
    1000
}

const fn default_jitter_reverse() -> u64 {
    550
}

const fn default_true() -> bool {
    true
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            seek_threshold_ms: default_seek_threshold(),
            resume_grace_ms: default_resume_grace(),
            min_dwell_ms: default_min_dwell(),
            forward_margin_ms: 0,
            backward_margin_ms: default_backward_margin(),
            jitter_reverse_ms: default_jitter_reverse(),
            auto_follow: true,
        }
    }
}

/// Gap interpolation parameters, in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpolationConfig {
    /// Spacing used when fewer than two anchors exist
    #[serde(default = "default_line_gap")]
    pub default_line_gap_secs: f64,
    /// Lower bound for the extrapolation step
    #[serde(default = "default_min_extrapolation")]
    pub min_extrapolation_secs: f64,
    /// Assumed length of the last line when spreading its words
    #[serde(default = "default_last_line")]
    pub last_line_secs: f64,
}

const fn default_line_gap() -> f64 {
    2.0
}

const fn default_min_extrapolation() -> f64 {
    0.5
}

const fn default_last_line() -> f64 {
    2.0
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            default_line_gap_secs: default_line_gap(),
            min_extrapolation_secs: default_min_extrapolation(),
            last_line_secs: default_last_line(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl LyricsyncConfig {
    /// Get the configuration directory path (~/.config/lyricsync/)
    #[must_use]
    pub fn config_dir() -> PathBuf {
        crate::paths::config_dir()
    }

    /// Get the config file path (~/.config/lyricsync/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        crate::paths::config_path()
    }

    /// Parse and validate a TOML document
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or a value is out of range.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a specific file
    ///
    /// # Errors
    ///
    /// Returns `ConfigNotFound` if the file does not exist, or an error if it cannot
    /// be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load config from `path`, or from the default location when `None`.
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read, parsed or validated.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let path = path.map_or_else(Self::config_path, Path::to_path_buf);
        match Self::load(&path) {
            Err(CoreError::ConfigNotFound { .. }) => Ok(Self::default()),
            other => other,
        }
    }

    /// Load config from the default location or create a template on first run
    ///
    /// # Errors
    ///
    /// Returns `ConfigNotFound` after writing the template, or an error if the config
    /// file cannot be read, parsed or validated.
    pub fn load_or_create() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            if let Some(parent) = config_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&config_path, CONFIG_TEMPLATE)?;

            return Err(CoreError::ConfigNotFound { path: config_path });
        }

        Self::load(&config_path)
    }

    fn validate(&self) -> Result<()> {
        let tracker = &self.tracker;
        let thresholds = [
            ("tracker.seek_threshold_ms", tracker.seek_threshold_ms),
            ("tracker.resume_grace_ms", tracker.resume_grace_ms),
            ("tracker.min_dwell_ms", tracker.min_dwell_ms),
            ("tracker.forward_margin_ms", tracker.forward_margin_ms),
            ("tracker.backward_margin_ms", tracker.backward_margin_ms),
            ("tracker.jitter_reverse_ms", tracker.jitter_reverse_ms),
        ];

        for (field, value) in thresholds {
            if value > MAX_TRACKER_MS {
                return Err(CoreError::config_invalid(format!(
                    "{field} must be at most {MAX_TRACKER_MS} ms, got {value}"
                )));
            }
        }

        let interpolation = &self.interpolation;
        let checks = [
            ("interpolation.default_line_gap_secs", interpolation.default_line_gap_secs),
            ("interpolation.min_extrapolation_secs", interpolation.min_extrapolation_secs),
            ("interpolation.last_line_secs", interpolation.last_line_secs),
        ];

        for (field, value) in checks {
            if !value.is_finite() || value <= 0.0 {
                return Err(CoreError::config_invalid(format!(
                    "{field} must be a positive number, got {value}"
                )));
            }
        }

        if self.logging.filter.trim().is_empty() {
            return Err(CoreError::config_invalid("logging.filter must not be empty"));
        }

        Ok(())
    }
}

const CONFIG_TEMPLATE: &str = r##"# Lyricsync Configuration
# ~/.config/lyricsync/config.toml

[tracker]
# Position jumps above this many milliseconds are treated as seeks
seek_threshold_ms = 800
# After resuming playback, jumps within this window are catch-up, not seeks
resume_grace_ms = 1200
# Minimum milliseconds between two forward line changes
min_dwell_ms = 120
# How early a forward move may commit before the line starts
forward_margin_ms = 0
# Position must fall this far behind the current line before moving back
backward_margin_ms = 1000
# Reverse position deltas below this are ignored as jitter
jitter_reverse_ms = 550
auto_follow = true

[interpolation]
# Line spacing when fewer than two timestamps are known
default_line_gap_secs = 2.0
# Smallest step used when extrapolating before the first or after the last timestamp
min_extrapolation_secs = 0.5
# Assumed length of the last line when spreading its words
last_line_secs = 2.0

[logging]
# Used when RUST_LOG is not set
filter = "info"
"##;
