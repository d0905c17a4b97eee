//! Connection security: mode resolution and STARTTLS negotiation.

use std::str::FromStr;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::warn;

use crate::command::Command;
use crate::connection::Connector;
use crate::error::{Error, Result};
use crate::session::Session;
use crate::types::{ReplyCode, Step};

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SecurityMode {
    /// No encryption. **Credentials travel in the clear.**
    Plain,
    /// TLS from the first byte (usually port 465).
    ImplicitTls,
    /// Start in plaintext, upgrade with `STARTTLS` (usually port 587 or 25).
    #[default]
    StartTls,
}

impl SecurityMode {
    /// Mode assumed when none is configured: implicit TLS on 465, STARTTLS elsewhere.
    #[must_use]
    pub const fn for_port(port: u16) -> Self {
        match port {
            465 => Self::ImplicitTls,
            _ => Self::StartTls,
        }
    }

    /// Returns the configuration keyword (`none`, `ssl`, `starttls`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "none",
            Self::ImplicitTls => "ssl",
            Self::StartTls => "starttls",
        }
    }

    /// Returns the human-readable name of the mode.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Plain => "None (insecure)",
            Self::ImplicitTls => "SSL/TLS",
            Self::StartTls => "STARTTLS",
        }
    }
}

impl FromStr for SecurityMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::Plain),
            "ssl" => Ok(Self::ImplicitTls),
            "starttls" => Ok(Self::StartTls),
            other => Err(Error::InvalidInput(format!(
                "Unknown security mode '{other}' (expected starttls, ssl or none)"
            ))),
        }
    }
}

impl std::fmt::Display for SecurityMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Where to submit, and how to secure the connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerEndpoint {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Resolved security mode; fixed for the lifetime of a session.
    pub security: SecurityMode,
}

impl ServerEndpoint {
    /// Resolves the security mode for a host and port.
    ///
    /// Without an explicit mode the port decides (see [`SecurityMode::for_port`]).
    /// Two contradictions are then corrected: port 465 always speaks implicit TLS,
    /// and port 25 never does (it is upgraded with STARTTLS instead).
    #[must_use]
    pub fn resolve(host: impl Into<String>, port: u16, configured: Option<SecurityMode>) -> Self {
        let requested = configured.unwrap_or_else(|| SecurityMode::for_port(port));
        let security = match (port, requested) {
            (465, mode) if mode != SecurityMode::ImplicitTls => SecurityMode::ImplicitTls,
            (25, SecurityMode::ImplicitTls) => SecurityMode::StartTls,
            (_, mode) => mode,
        };
        if security != requested {
            warn!(
                port,
                requested = requested.as_str(),
                resolved = security.as_str(),
                "security mode corrected for port"
            );
        }

        Self {
            host: host.into(),
            port,
            security,
        }
    }
}

impl std::fmt::Display for ServerEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} ({})", self.host, self.port, self.security)
    }
}

/// Sends `STARTTLS`, requires `220`, and upgrades the session's socket in place.
///
/// The caller re-issues `EHLO` afterwards; RFC 3207 discards all state learned
/// before the upgrade.
///
/// # Errors
///
/// Returns [`Error::UnexpectedReply`] for [`Step::SecureUpgrade`] if the server
/// declines, or a TLS error if the handshake fails.
pub async fn start_tls<C>(session: &mut Session<C::Stream>, connector: &C, host: &str) -> Result<()>
where
    C: Connector,
    C::Stream: AsyncRead + AsyncWrite + Unpin + Send,
{
    session
        .expect(
            &Command::StartTls,
            Step::SecureUpgrade,
            ReplyCode::SERVICE_READY,
        )
        .await?;
    session.upgrade(connector, host).await
}
