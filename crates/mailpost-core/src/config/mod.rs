//! Configuration loading.
//!
//! Settings come from plain key/value pairs: a `.env` file, the process
//! environment, or any map. Resolution is a pure function of those pairs.

mod env_file;
mod settings;

use std::io;
use std::path::PathBuf;

pub use env_file::EnvFile;
pub use settings::{Settings, keys};

/// Errors raised while building [`Settings`]. Always fatal.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The `.env` file does not exist.
    #[error(".env file not found at: {}", path.display())]
    EnvFileNotFound {
        /// Path that was tried.
        path: PathBuf,
    },

    /// The `.env` file exists but could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    EnvFileRead {
        /// Path that was tried.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A key is present but its value cannot be used.
    #[error("Invalid {key} '{value}': {reason}")]
    InvalidValue {
        /// Configuration key.
        key: &'static str,
        /// Offending value.
        value: String,
        /// What was expected.
        reason: &'static str,
    },

    /// A key needed by the rest of the configuration is missing or empty.
    #[error("{key} is required when {required_by} is enabled")]
    Missing {
        /// Missing key.
        key: &'static str,
        /// Key whose value makes it required.
        required_by: &'static str,
    },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
