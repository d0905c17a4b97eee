//! Error types for SMTP submission.

use std::io;

use crate::types::{AuthMechanism, Step};

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An envelope address failed syntax validation. No network I/O happened.
    #[error("Invalid {role} email address: {address}")]
    InvalidAddress {
        /// Which envelope field was rejected (`sender` or `recipient`).
        role: &'static str,
        /// The offending input.
        address: String,
    },

    /// Envelope input other than an address was rejected before connecting.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O error on the socket.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Connection could not be established, was closed early, or timed out.
    #[error("Connection error: {0}")]
    Connection(String),

    /// TLS handshake or configuration failed.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Server reply could not be parsed.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Server answered a step with a code other than the required one.
    #[error("Unexpected reply to {step}: {code} {text}")]
    UnexpectedReply {
        /// Step that failed.
        step: Step,
        /// Reply code received.
        code: u16,
        /// Raw server text.
        text: String,
    },

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),
}

/// Authentication failures.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Neither `AUTH PLAIN` nor `AUTH LOGIN` was accepted by the server.
    #[error("server offers no supported mechanism (PLAIN, LOGIN)")]
    NoSupportedMechanism,

    /// The server rejected the credentials.
    #[error("{mechanism} credentials rejected: {code} {text}")]
    CredentialsRejected {
        /// Mechanism in use.
        mechanism: AuthMechanism,
        /// Reply code received.
        code: u16,
        /// Raw server text.
        text: String,
    },

    /// The server answered an intermediate stage with an unexpected code.
    #[error("{mechanism} exchange aborted at {stage}: {code} {text}")]
    Aborted {
        /// Mechanism in use.
        mechanism: AuthMechanism,
        /// Exchange stage (`username`, `password`, `response`).
        stage: &'static str,
        /// Reply code received.
        code: u16,
        /// Raw server text.
        text: String,
    },
}

/// Coarse classification of an [`Error`], for callers that branch on failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input, rejected before any socket was opened.
    InputValidation,
    /// Socket establishment, greeting, early close, or timeout.
    Connection,
    /// STARTTLS rejection or TLS handshake failure.
    Tls,
    /// Unparseable or out-of-sequence server reply.
    Protocol,
    /// Authentication failure.
    Auth,
    /// `MAIL FROM` or `RCPT TO` rejected.
    Envelope,
    /// `DATA` rejected.
    DataPhase,
    /// Message content rejected after the terminating dot.
    Delivery,
}

impl ErrorKind {
    /// Returns true for the recipient/body/data-phase rejection classes.
    #[must_use]
    pub const fn is_delivery(self) -> bool {
        matches!(self, Self::Envelope | Self::DataPhase | Self::Delivery)
    }
}

impl Error {
    /// Creates an unexpected-reply error for a step.
    #[must_use]
    pub fn unexpected(step: Step, code: u16, text: impl Into<String>) -> Self {
        Self::UnexpectedReply {
            step,
            code,
            text: text.into(),
        }
    }

    /// Returns the failure class.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAddress { .. } | Self::InvalidInput(_) => ErrorKind::InputValidation,
            Self::Io(_) | Self::Connection(_) => ErrorKind::Connection,
            Self::Tls(_) => ErrorKind::Tls,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::Auth(_) => ErrorKind::Auth,
            Self::UnexpectedReply { step, .. } => match step {
                Step::Connect => ErrorKind::Connection,
                Step::SecureUpgrade => ErrorKind::Tls,
                Step::Authenticate => ErrorKind::Auth,
                Step::SetSender | Step::SetRecipient => ErrorKind::Envelope,
                Step::OpenData => ErrorKind::DataPhase,
                Step::Transmit => ErrorKind::Delivery,
                Step::Greet | Step::ReGreet | Step::Close => ErrorKind::Protocol,
            },
        }
    }

    /// Returns the step that failed, when the server rejected one.
    #[must_use]
    pub const fn step(&self) -> Option<Step> {
        match self {
            Self::UnexpectedReply { step, .. } => Some(*step),
            Self::Auth(_) => Some(Step::Authenticate),
            _ => None,
        }
    }

    /// Returns true if this is a permanent server rejection (5xx).
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::UnexpectedReply { code, .. } if *code >= 500 && *code < 600)
    }

    /// Returns true if this is a transient server rejection (4xx).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::UnexpectedReply { code, .. } if *code >= 400 && *code < 500)
    }
}

impl From<rustls::Error> for Error {
    fn from(err: rustls::Error) -> Self {
        Self::Tls(err.to_string())
    }
}
