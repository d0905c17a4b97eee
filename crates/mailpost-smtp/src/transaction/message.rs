//! Envelope and message content.

use crate::error::{Error, Result};
use crate::types::Address;

/// One message to one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Sender, used for `MAIL FROM` and the `From` header.
    pub from: Address,
    /// Recipient, used for `RCPT TO` and the `To` header.
    pub to: Address,
    /// Subject header value.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
}

impl Envelope {
    /// Validates the input and builds an envelope. No network I/O happens here.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] for a malformed sender or recipient and
    /// [`Error::InvalidInput`] for a subject that would break the header block.
    pub fn new(
        from: &str,
        to: &str,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<Self> {
        let from = Address::parse(from.trim(), "sender")?;
        let to = Address::parse(to.trim(), "recipient")?;
        let subject = subject.into();
        if subject.contains(['\r', '\n']) {
            return Err(Error::InvalidInput(
                "Subject must be a single line".into(),
            ));
        }

        Ok(Self {
            from,
            to,
            subject,
            body: body.into(),
        })
    }

    /// Builds the RFC 5322 header block, the blank separator line, and the body.
    #[must_use]
    pub fn to_rfc5322(&self) -> String {
        use std::fmt::Write;

        let mut message = String::new();

        let _ = writeln!(message, "From: {}\r", self.from);
        let _ = writeln!(message, "To: {}\r", self.to);
        let _ = writeln!(message, "Subject: {}\r", self.subject);
        message.push_str("MIME-Version: 1.0\r\n");
        message.push_str("Content-Type: text/plain; charset=UTF-8\r\n");
        message.push_str("Content-Transfer-Encoding: 8bit\r\n");

        // Empty line between headers and body
        message.push_str("\r\n");

        message.push_str(&self.body);

        message
    }

    /// Returns the bytes sent after `DATA`, terminator included.
    #[must_use]
    pub fn to_data(&self) -> Vec<u8> {
        encode_data(self.to_rfc5322().as_bytes())
    }
}

/// Prepares content for the DATA phase (RFC 5321 §4.5.2).
///
/// Line endings (CRLF, bare LF, and bare CR alike) are normalized to CRLF, lines
/// starting with `.` get an extra leading `.`, and the `.` terminator line is
/// appended. A final line break in `content` is not doubled.
#[must_use]
pub fn encode_data(content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len() + content.len() / 32 + 5);
    let mut at_line_start = true;

    let mut bytes = content.iter().copied().peekable();
    while let Some(byte) = bytes.next() {
        match byte {
            b'\r' => {
                bytes.next_if_eq(&b'\n');
                out.extend_from_slice(b"\r\n");
                at_line_start = true;
            }
            b'\n' => {
                out.extend_from_slice(b"\r\n");
                at_line_start = true;
            }
            _ => {
                if at_line_start && byte == b'.' {
                    out.push(b'.');
                }
                out.push(byte);
                at_line_start = false;
            }
        }
    }

    if !at_line_start || out.is_empty() {
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b".\r\n");
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn envelope(body: &str) -> Envelope {
        Envelope::new("alice@example.com", "bob@example.org", "Hello", body).unwrap()
    }

    #[test]
    fn test_headers() {
        let message = envelope("Hi Bob").to_rfc5322();
        assert_eq!(
            message,
            "From: alice@example.com\r\n\
             To: bob@example.org\r\n\
             Subject: Hello\r\n\
             MIME-Version: 1.0\r\n\
             Content-Type: text/plain; charset=UTF-8\r\n\
             Content-Transfer-Encoding: 8bit\r\n\
             \r\n\
             Hi Bob"
        );
    }

    #[test]
    fn test_data_terminated() {
        let data = envelope("Hi Bob").to_data();
        assert!(data.ends_with(b"\r\n\r\nHi Bob\r\n.\r\n"));
    }

    #[test]
    fn test_trailing_newline_not_doubled() {
        assert_eq!(encode_data(b"line\r\n"), b"line\r\n.\r\n");
        assert_eq!(encode_data(b"line\n"), b"line\r\n.\r\n");
    }

    #[test]
    fn test_bare_lf_normalized() {
        assert_eq!(encode_data(b"one\ntwo\r\nthree"), b"one\r\ntwo\r\nthree\r\n.\r\n");
    }

    #[test]
    fn test_bare_cr_normalized() {
        assert_eq!(encode_data(b"one\rtwo"), b"one\r\ntwo\r\n.\r\n");
        assert_eq!(encode_data(b"one\r\r\ntwo\r"), b"one\r\n\r\ntwo\r\n.\r\n");
    }

    #[test]
    fn test_dot_after_bare_cr_is_stuffed() {
        assert_eq!(encode_data(b"\r.x"), b"\r\n..x\r\n.\r\n");
        assert_eq!(encode_data(b"end\r.\r\n"), b"end\r\n..\r\n.\r\n");
    }

    #[test]
    fn test_dot_stuffing() {
        assert_eq!(
            encode_data(b"first\r\n.\r\n..two\r\nmid.dle"),
            b"first\r\n..\r\n...two\r\nmid.dle\r\n.\r\n"
        );
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(encode_data(b""), b"\r\n.\r\n");
    }

    #[test]
    fn test_invalid_sender_rejected() {
        let err = Envelope::new("not-an-address", "bob@example.org", "s", "b").unwrap_err();
        assert_eq!(err.to_string(), "Invalid sender email address: not-an-address");
    }

    #[test]
    fn test_invalid_recipient_rejected() {
        let err = Envelope::new("alice@example.com", "bob@", "s", "b").unwrap_err();
        assert!(err.to_string().contains("recipient"));
    }

    #[test]
    fn test_multiline_subject_rejected() {
        let err = Envelope::new(
            "alice@example.com",
            "bob@example.org",
            "Hi\r\nBcc: eve@example.net",
            "b",
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_addresses_trimmed() {
        let env = Envelope::new(" alice@example.com ", "bob@example.org\n", "s", "b").unwrap();
        assert_eq!(env.from.as_str(), "alice@example.com");
        assert_eq!(env.to.as_str(), "bob@example.org");
    }
}
