use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // Configuration errors
    #[error("Config file not found at {path}. A template has been created - edit it and restart.")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid config: {message}")]
    ConfigInvalid { message: String },

    #[error("Failed to parse config file: {0}")]
    ConfigParseError(#[from] toml::de::Error),

    // Repair errors
    #[error("Repair rejected: {reason}")]
    RepairValidation { reason: String },

    #[error("Corrected lyrics contain no non-empty lines")]
    EmptyLyrics,

    // IO errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CoreError {
    pub(crate) fn repair_validation(reason: impl Into<String>) -> Self {
        Self::RepairValidation {
            reason: reason.into(),
        }
    }

    pub(crate) fn config_invalid(message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
