//! Transaction steps.

/// A step of the submission transaction, in protocol order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Step {
    /// Waiting for the server greeting.
    Connect,
    /// First `EHLO`.
    Greet,
    /// `STARTTLS` and the in-place TLS upgrade.
    SecureUpgrade,
    /// `EHLO` re-issued after the upgrade.
    ReGreet,
    /// `AUTH` exchange.
    Authenticate,
    /// `MAIL FROM`.
    SetSender,
    /// `RCPT TO`.
    SetRecipient,
    /// `DATA`.
    OpenData,
    /// Message content and the terminating dot.
    Transmit,
    /// `QUIT`.
    Close,
}

impl Step {
    /// Returns a short human-readable name for diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Connect => "greeting",
            Self::Greet => "EHLO",
            Self::SecureUpgrade => "STARTTLS",
            Self::ReGreet => "EHLO (after STARTTLS)",
            Self::Authenticate => "AUTH",
            Self::SetSender => "MAIL FROM (sender)",
            Self::SetRecipient => "RCPT TO (recipient)",
            Self::OpenData => "DATA",
            Self::Transmit => "message transmission",
            Self::Close => "QUIT",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
