//! Socket establishment seam.

use std::future::Future;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};

use super::stream::{SmtpStream, connect_plain, connect_tls};
use super::tls::TlsOptions;
use crate::error::{Error, Result};
use crate::security::{SecurityMode, ServerEndpoint};

/// Default bound on connection establishment.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// A failed STARTTLS upgrade.
#[derive(Debug)]
pub struct UpgradeError<S> {
    /// Why the upgrade failed.
    pub error: Error,
    /// The plaintext stream, still open, when the handshake gave it back.
    pub stream: Option<S>,
}

impl<S> UpgradeError<S> {
    /// An upgrade failure that consumed the stream.
    #[must_use]
    pub const fn lost(error: Error) -> Self {
        Self {
            error,
            stream: None,
        }
    }

    /// An upgrade failure that returned the stream to the caller.
    #[must_use]
    pub const fn returned(error: Error, stream: S) -> Self {
        Self {
            error,
            stream: Some(stream),
        }
    }
}

/// Opens sockets for a transaction and upgrades them for STARTTLS.
///
/// [`TcpConnector`] is the real implementation; tests substitute scripted streams.
pub trait Connector: Send + Sync {
    /// Stream type produced by this connector.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    /// Opens a connection, already wrapped in TLS for [`SecurityMode::ImplicitTls`].
    fn connect(&self, endpoint: &ServerEndpoint) -> impl Future<Output = Result<Self::Stream>> + Send;

    /// Upgrades an established plaintext connection to TLS in place.
    ///
    /// On failure the stream is handed back whenever it survived, so the
    /// caller can still shut it down.
    fn upgrade(
        &self,
        stream: Self::Stream,
        host: &str,
    ) -> impl Future<Output = std::result::Result<Self::Stream, UpgradeError<Self::Stream>>> + Send;
}

/// Connector over real TCP sockets.
#[derive(Debug, Clone, Copy)]
pub struct TcpConnector {
    tls: TlsOptions,
    connect_timeout: Duration,
}

impl TcpConnector {
    /// Creates a connector with certificate verification on and a 30 second connect bound.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tls: TlsOptions {
                accept_invalid_certs: false,
            },
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Sets the TLS options.
    #[must_use]
    pub const fn tls(mut self, tls: TlsOptions) -> Self {
        self.tls = tls;
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for TcpConnector {
    type Stream = SmtpStream;

    async fn connect(&self, endpoint: &ServerEndpoint) -> Result<SmtpStream> {
        match endpoint.security {
            SecurityMode::ImplicitTls => {
                connect_tls(&endpoint.host, endpoint.port, self.connect_timeout, self.tls).await
            }
            SecurityMode::StartTls | SecurityMode::Plain => {
                connect_plain(&endpoint.host, endpoint.port, self.connect_timeout).await
            }
        }
    }

    async fn upgrade(
        &self,
        stream: SmtpStream,
        host: &str,
    ) -> std::result::Result<SmtpStream, UpgradeError<SmtpStream>> {
        tokio::time::timeout(self.connect_timeout, stream.upgrade_to_tls(host, self.tls))
            .await
            .unwrap_or_else(|_| {
                Err(UpgradeError::lost(Error::Connection(format!(
                    "STARTTLS handshake with {host} timed out"
                ))))
            })
    }
}
