//! Per-send session: one socket, its TLS state, and its single close.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use crate::command::Command;
use crate::connection::{Connector, Wire};
use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode, Step};

/// The mutable state of one send: the socket and whether it has been upgraded.
///
/// Not shareable; every operation takes `&mut self`. [`Session::close`] may be
/// called any number of times and shuts the socket down at most once.
#[derive(Debug)]
pub struct Session<S> {
    wire: Option<Wire<S>>,
    io_timeout: Duration,
    tls: bool,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Starts a session over a freshly connected stream.
    pub fn new(stream: S, io_timeout: Duration, tls: bool) -> Self {
        Self {
            wire: Some(Wire::new(stream, io_timeout)),
            io_timeout,
            tls,
        }
    }

    /// Returns true once the socket is TLS-protected.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        self.tls
    }

    /// Returns true while the socket is open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.wire.is_some()
    }

    /// Reads one reply without sending anything (the greeting).
    ///
    /// # Errors
    ///
    /// Returns an error if the session is closed or the read fails.
    pub async fn read_reply(&mut self) -> Result<Reply> {
        self.wire()?.read_reply().await
    }

    /// Sends a command and returns whatever the server replied.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is closed or the round trip fails.
    pub async fn command(&mut self, command: &Command) -> Result<Reply> {
        self.wire()?.send_command(command).await
    }

    /// Sends a command and requires `expected` in reply.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedReply`] naming `step` when the code differs.
    pub async fn expect(
        &mut self,
        command: &Command,
        step: Step,
        expected: ReplyCode,
    ) -> Result<Reply> {
        let reply = self.command(command).await?;
        require(reply, step, expected)
    }

    /// Sends a base64 credential line.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is closed or the round trip fails.
    pub async fn secret(&mut self, encoded: &str) -> Result<Reply> {
        self.wire()?.send_secret(encoded).await
    }

    /// Sends message data (already terminated) and requires `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedReply`] for [`Step::Transmit`] when the code differs.
    pub async fn data(&mut self, data: &[u8], expected: ReplyCode) -> Result<Reply> {
        let reply = self.wire()?.send_data(data).await?;
        require(reply, Step::Transmit, expected)
    }

    /// Replaces the plaintext socket with a TLS one negotiated over it.
    ///
    /// # Errors
    ///
    /// Returns an error if the server sent data ahead of the handshake or the
    /// handshake fails. The socket stays owned by the session whenever it
    /// survived, so [`Session::close`] still shuts it down.
    pub async fn upgrade<C>(&mut self, connector: &C, host: &str) -> Result<()>
    where
        C: Connector<Stream = S>,
    {
        if self.wire()?.has_buffered_data() {
            return Err(Error::Protocol(
                "Server sent data before the TLS handshake".into(),
            ));
        }
        let wire = self
            .wire
            .take()
            .ok_or_else(|| Error::Connection("Session already closed".into()))?;
        let stream = wire.into_inner()?;
        match connector.upgrade(stream, host).await {
            Ok(stream) => {
                self.wire = Some(Wire::new(stream, self.io_timeout));
                self.tls = true;
                Ok(())
            }
            Err(failure) => {
                self.wire = failure
                    .stream
                    .map(|stream| Wire::new(stream, self.io_timeout));
                Err(failure.error)
            }
        }
    }

    /// Closes the socket. Safe to call repeatedly.
    pub async fn close(&mut self) {
        if let Some(mut wire) = self.wire.take() {
            wire.shutdown().await;
            debug!("session closed");
        }
    }

    fn wire(&mut self) -> Result<&mut Wire<S>> {
        self.wire
            .as_mut()
            .ok_or_else(|| Error::Connection("Session already closed".into()))
    }
}

/// Checks a reply code against the one a step requires.
///
/// # Errors
///
/// Returns [`Error::UnexpectedReply`] naming `step` when the code differs.
pub fn require(reply: Reply, step: Step, expected: ReplyCode) -> Result<Reply> {
    if reply.is(expected) {
        Ok(reply)
    } else {
        Err(Error::unexpected(
            step,
            reply.code.as_u16(),
            reply.message_text(),
        ))
    }
}
