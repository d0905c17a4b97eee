//! Email address types.

use std::str::FromStr;

use email_address::EmailAddress;

use crate::error::{Error, Result};

/// Email address for the SMTP envelope.
///
/// Construction validates RFC 5322 `addr-spec` syntax and additionally
/// requires a dotted domain, matching what public submission servers accept.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Creates a new address, naming `role` (`sender`, `recipient`) in the error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if the address is invalid.
    pub fn parse(addr: impl Into<String>, role: &'static str) -> Result<Self> {
        let addr = addr.into();
        if is_valid(&addr) {
            Ok(Self(addr))
        } else {
            Err(Error::InvalidAddress {
                role,
                address: addr,
            })
        }
    }

    /// Creates a new address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if the address is invalid.
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        Self::parse(addr, "email")
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn is_valid(addr: &str) -> bool {
    // Display names and angle brackets belong in headers, never in the envelope.
    if addr
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || c == '<' || c == '>')
    {
        return false;
    }
    if !EmailAddress::is_valid(addr) {
        return false;
    }

    let Some((_, domain)) = addr.rsplit_once('@') else {
        return false;
    };
    if domain.starts_with('[') {
        // Address literal, already checked by the parser.
        return true;
    }
    domain.contains('.')
        && domain
            .split('.')
            .all(|label| !label.is_empty() && !label.starts_with('-') && !label.ends_with('-'))
}
