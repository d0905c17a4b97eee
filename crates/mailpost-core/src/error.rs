//! Error types for the core library.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors returned by [`Mailer`](crate::Mailer) and configuration loading.
#[derive(Debug, Error)]
pub enum Error {
    /// One of the four message fields was empty. No connection was made.
    #[error("All fields are required.")]
    MissingFields,

    /// Configuration could not be resolved.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The SMTP transaction failed.
    #[error(transparent)]
    Smtp(#[from] mailpost_smtp::Error),
}

impl Error {
    /// Returns the SMTP failure class, if the failure came from the transaction.
    #[must_use]
    pub const fn smtp_kind(&self) -> Option<mailpost_smtp::ErrorKind> {
        match self {
            Self::Smtp(err) => Some(err.kind()),
            _ => None,
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
