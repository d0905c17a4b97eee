//! `.env` file parsing.

use std::collections::HashMap;
use std::io;
use std::path::Path;

use tracing::debug;

use super::{ConfigError, ConfigResult};

/// Key/value pairs read from a `.env` file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvFile {
    vars: HashMap<String, String>,
}

impl EnvFile {
    /// Reads and parses the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EnvFileNotFound`] naming the path if the file does
    /// not exist, or [`ConfigError::EnvFileRead`] if it cannot be read.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ConfigError::EnvFileNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigError::EnvFileRead {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let file = Self::parse(&content);
        debug!(path = %path.display(), keys = file.len(), "loaded env file");
        Ok(file)
    }

    /// Parses `KEY=VALUE` lines.
    ///
    /// Blank lines and `#` comments are skipped, as are lines without `=`.
    /// Keys and values are trimmed, and a value wrapped in matching single or
    /// double quotes is unquoted. A repeated key keeps its last value.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let vars = content
            .lines()
            .filter(|line| {
                let trimmed = line.trim();
                !trimmed.is_empty() && !trimmed.starts_with('#')
            })
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| (key.trim().to_string(), unquote(value.trim()).to_string()))
            .collect();

        Self { vars }
    }

    /// Returns the value of `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Returns the number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns true if no keys were read.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}
