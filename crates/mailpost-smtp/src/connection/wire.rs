//! Line-level SMTP I/O: one command out, one complete reply back.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, trace};

use crate::command::Command;
use crate::error::{Error, Result};
use crate::parser::{check_line, is_last_reply_line, parse_reply};
use crate::types::Reply;

/// Default bound on each read or write.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(60);

/// Longest reply line accepted before the peer is considered broken.
const MAX_LINE_LENGTH: u64 = 8192;

/// Most lines accepted in one multi-line reply.
const MAX_REPLY_LINES: usize = 512;

/// Buffered, timeout-bounded command/reply channel over a stream.
#[derive(Debug)]
pub struct Wire<S> {
    reader: BufReader<S>,
    io_timeout: Duration,
}

impl<S> Wire<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a connected stream.
    pub fn new(stream: S, io_timeout: Duration) -> Self {
        Self {
            reader: BufReader::new(stream),
            io_timeout,
        }
    }

    /// Writes `command` followed by CRLF and reads the complete reply.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure, timeout, early close, or a malformed reply.
    pub async fn send_command(&mut self, command: &Command) -> Result<Reply> {
        debug!("C: {command}");
        self.write_raw(&command.serialize()).await?;
        self.read_reply().await
    }

    /// Writes a credential line and reads the reply. Only the length is traced.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure, timeout, early close, or a malformed reply.
    pub async fn send_secret(&mut self, encoded: &str) -> Result<Reply> {
        trace!(len = encoded.len(), "C: <credentials>");
        let mut line = Vec::with_capacity(encoded.len() + 2);
        line.extend_from_slice(encoded.as_bytes());
        line.extend_from_slice(b"\r\n");
        self.write_raw(&line).await?;
        self.read_reply().await
    }

    /// Writes message data verbatim and reads the reply that follows it.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure, timeout, early close, or a malformed reply.
    pub async fn send_data(&mut self, data: &[u8]) -> Result<Reply> {
        debug!(bytes = data.len(), "C: <message data>");
        self.write_raw(data).await?;
        self.read_reply().await
    }

    /// Reads lines until a final reply line arrives.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the server closes the connection or stays
    /// silent past the I/O timeout, and [`Error::Protocol`] as soon as a line is
    /// malformed or the reply runs past its line limit.
    pub async fn read_reply(&mut self) -> Result<Reply> {
        let mut lines = Vec::new();
        loop {
            let line = self.read_line().await?;
            if line.is_empty() {
                continue;
            }
            debug!("S: {line}");
            check_line(&line)?;
            if lines.len() == MAX_REPLY_LINES {
                return Err(Error::Protocol(format!(
                    "Reply exceeds {MAX_REPLY_LINES} lines"
                )));
            }

            let is_last = is_last_reply_line(&line);
            lines.push(line);

            if is_last {
                break;
            }
        }

        parse_reply(&lines)
    }

    /// Returns true if bytes the server sent are waiting unread in the buffer.
    #[must_use]
    pub fn has_buffered_data(&self) -> bool {
        !self.reader.buffer().is_empty()
    }

    /// Gives back the underlying stream, e.g. for a TLS upgrade.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if unread server data would be lost, which after
    /// `STARTTLS` indicates plaintext injected ahead of the handshake.
    pub fn into_inner(self) -> Result<S> {
        if self.has_buffered_data() {
            return Err(Error::Protocol(
                "Server sent data before the TLS handshake".into(),
            ));
        }
        Ok(self.reader.into_inner())
    }

    /// Shuts the stream down, ignoring errors; the peer may already be gone.
    pub async fn shutdown(&mut self) {
        let shutdown = self.reader.get_mut().shutdown();
        match tokio::time::timeout(self.io_timeout, shutdown).await {
            Ok(Ok(())) => trace!("connection shut down"),
            Ok(Err(e)) => trace!("shutdown failed: {e}"),
            Err(_) => trace!("shutdown timed out"),
        }
    }

    async fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        let io_timeout = self.io_timeout;
        let stream = self.reader.get_mut();
        let write = async {
            stream.write_all(data).await?;
            stream.flush().await
        };
        match tokio::time::timeout(io_timeout, write).await {
            Ok(result) => result.map_err(Error::from),
            Err(_) => Err(Error::Connection(format!(
                "Write timed out after {}s",
                io_timeout.as_secs()
            ))),
        }
    }

    async fn read_line(&mut self) -> Result<String> {
        let io_timeout = self.io_timeout;
        let mut buf = Vec::new();
        let mut limited = (&mut self.reader).take(MAX_LINE_LENGTH);
        let read = limited.read_until(b'\n', &mut buf);
        let n = match tokio::time::timeout(io_timeout, read).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(Error::Connection(format!(
                    "No reply from server within {}s",
                    io_timeout.as_secs()
                )));
            }
        };

        if n == 0 {
            return Err(Error::Connection(
                "Server closed the connection".to_string(),
            ));
        }
        if buf.last() != Some(&b'\n') {
            if u64::try_from(buf.len()).unwrap_or(u64::MAX) >= MAX_LINE_LENGTH {
                return Err(Error::Protocol("Reply line too long".into()));
            }
            return Err(Error::Connection(
                "Server closed the connection mid-reply".to_string(),
            ));
        }

        Ok(String::from_utf8_lossy(&buf).trim_end().to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::ReplyCode;
    use tokio_test::io::Builder;

    fn wire(mock: tokio_test::io::Mock) -> Wire<tokio_test::io::Mock> {
        Wire::new(mock, DEFAULT_IO_TIMEOUT)
    }

    #[tokio::test]
    async fn test_read_single_line() {
        let mock = Builder::new().read(b"220 smtp.example.com ESMTP\r\n").build();
        let reply = wire(mock).read_reply().await.unwrap();
        assert_eq!(reply.code, ReplyCode::SERVICE_READY);
        assert_eq!(reply.lines, vec!["smtp.example.com ESMTP"]);
    }

    #[tokio::test]
    async fn test_read_multi_line_as_one_reply() {
        let mock = Builder::new()
            .read(b"250-Feature1\r\n250-Feature2\r\n250 OK\r\n")
            .build();
        let reply = wire(mock).read_reply().await.unwrap();
        assert_eq!(reply.code, ReplyCode::OK);
        assert_eq!(reply.lines, vec!["Feature1", "Feature2", "OK"]);
        assert!(reply.is_final);
    }

    #[tokio::test]
    async fn test_read_reply_split_across_reads() {
        let mock = Builder::new()
            .read(b"250-smtp.exa")
            .read(b"mple.com\r\n250 ")
            .read(b"STARTTLS\r\n")
            .build();
        let reply = wire(mock).read_reply().await.unwrap();
        assert_eq!(reply.lines, vec!["smtp.example.com", "STARTTLS"]);
    }

    #[tokio::test]
    async fn test_send_command_round_trip() {
        let mock = Builder::new()
            .write(b"EHLO client.example.com\r\n")
            .read(b"250 smtp.example.com\r\n")
            .build();
        let cmd = Command::Ehlo {
            hostname: "client.example.com".into(),
        };
        let reply = wire(mock).send_command(&cmd).await.unwrap();
        assert_eq!(reply.code, ReplyCode::OK);
    }

    #[tokio::test]
    async fn test_send_secret_writes_line() {
        let mock = Builder::new()
            .write(b"dXNlcg==\r\n")
            .read(b"334 UGFzc3dvcmQ6\r\n")
            .build();
        let reply = wire(mock).send_secret("dXNlcg==").await.unwrap();
        assert_eq!(reply.code, ReplyCode::AUTH_CONTINUE);
    }

    #[tokio::test]
    async fn test_eof_is_connection_error() {
        let mock = Builder::new().build();
        let err = wire(mock).read_reply().await.unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
    }

    #[tokio::test]
    async fn test_eof_mid_reply_is_connection_error() {
        let mock = Builder::new().read(b"250-partial\r\n250 trunc").build();
        let err = wire(mock).read_reply().await.unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_server_times_out() {
        let mock = Builder::new().wait(Duration::from_secs(120)).build();
        let err = Wire::new(mock, Duration::from_secs(5))
            .read_reply()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No reply from server"));
    }

    #[tokio::test]
    async fn test_malformed_line_fails_without_waiting() {
        let mock = Builder::new().read(b"Welcome to the server\r\n").build();
        let err = wire(mock).read_reply().await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)), "{err}");
    }

    #[tokio::test]
    async fn test_endless_continuation_is_capped() {
        let flood = "250-x\r\n".repeat(MAX_REPLY_LINES + 88);
        let mock = Builder::new().read(flood.as_bytes()).build();
        let err = wire(mock).read_reply().await.unwrap_err();
        assert!(err.to_string().contains("Reply exceeds 512 lines"), "{err}");
    }

    #[tokio::test]
    async fn test_into_inner_rejects_buffered_data() {
        let mock = Builder::new()
            .read(b"220 Go ahead\r\n250 injected\r\n")
            .build();
        let mut wire = wire(mock);
        wire.read_reply().await.unwrap();
        assert!(wire.has_buffered_data());
        assert!(wire.into_inner().is_err());
    }
}
