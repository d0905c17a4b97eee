//! Stream types for SMTP connections.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;

use super::connector::UpgradeError;
use super::tls::{TlsOptions, create_tls_connector, server_name};
use crate::error::{Error, Result};

/// A stream that can be either plaintext or TLS.
#[derive(Debug)]
pub enum SmtpStream {
    /// Plaintext TCP stream.
    Plain(TcpStream),
    /// TLS-encrypted stream (boxed to reduce enum size).
    Tls(Box<TlsStream<TcpStream>>),
}

impl SmtpStream {
    /// Upgrades a plaintext stream to TLS in place (STARTTLS).
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is already TLS or the handshake fails; the
    /// plaintext stream comes back with the error.
    pub async fn upgrade_to_tls(
        self,
        host: &str,
        options: TlsOptions,
    ) -> std::result::Result<Self, UpgradeError<Self>> {
        match self {
            Self::Plain(tcp) => match handshake(tcp, host, options).await {
                Ok(tls) => Ok(Self::Tls(Box::new(tls))),
                Err((error, tcp)) => Err(UpgradeError::returned(error, Self::Plain(tcp))),
            },
            tls @ Self::Tls(_) => Err(UpgradeError::returned(
                Error::Protocol("Stream is already TLS".to_string()),
                tls,
            )),
        }
    }

    /// Returns true if the stream is TLS-encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }
}

impl AsyncRead for SmtpStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for SmtpStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_flush(cx),
            Self::Tls(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            Self::Tls(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

/// Connects to a server without TLS (plaintext or STARTTLS).
///
/// # Errors
///
/// Returns [`Error::Connection`] if the connection fails or takes longer than `timeout`.
pub async fn connect_plain(host: &str, port: u16, timeout: Duration) -> Result<SmtpStream> {
    let tcp = tcp_connect(host, port, timeout).await?;
    Ok(SmtpStream::Plain(tcp))
}

/// Connects to a server with TLS from the start (implicit TLS, usually port 465).
///
/// The timeout covers both the TCP connect and the TLS handshake.
///
/// # Errors
///
/// Returns an error if the connection or TLS handshake fails or times out.
pub async fn connect_tls(
    host: &str,
    port: u16,
    timeout: Duration,
    options: TlsOptions,
) -> Result<SmtpStream> {
    let connect = async {
        let tcp = tcp_connect(host, port, timeout).await?;
        handshake(tcp, host, options).await.map_err(|(error, _)| error)
    };
    let tls = tokio::time::timeout(timeout, connect)
        .await
        .map_err(|_| Error::Connection(format!("TLS handshake with {host}:{port} timed out")))??;
    Ok(SmtpStream::Tls(Box::new(tls)))
}

async fn tcp_connect(host: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
    let addr = format!("{host}:{port}");
    match tokio::time::timeout(timeout, TcpStream::connect(&addr)).await {
        Ok(Ok(tcp)) => Ok(tcp),
        Ok(Err(e)) => Err(Error::Connection(format!(
            "Failed to connect to {addr}: {e}"
        ))),
        Err(_) => Err(Error::Connection(format!(
            "Connecting to {addr} timed out after {}s",
            timeout.as_secs()
        ))),
    }
}

/// Runs the TLS handshake, giving the TCP stream back if it fails.
async fn handshake(
    tcp: TcpStream,
    host: &str,
    options: TlsOptions,
) -> std::result::Result<TlsStream<TcpStream>, (Error, TcpStream)> {
    let connector = match create_tls_connector(options) {
        Ok(connector) => connector,
        Err(e) => return Err((e, tcp)),
    };
    let name = match server_name(host) {
        Ok(name) => name,
        Err(e) => return Err((e, tcp)),
    };
    connector
        .connect(name, tcp)
        .into_fallible()
        .await
        .map_err(|(e, tcp)| (Error::Tls(format!("TLS handshake with {host} failed: {e}")), tcp))
}
