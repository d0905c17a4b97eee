//! SMTP reply parser.

use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

/// Parses an SMTP reply from its response lines (line endings already stripped).
///
/// SMTP replies can be single-line or multi-line:
/// - Single: `250 OK\r\n`
/// - Multi: `250-First line\r\n250-Second line\r\n250 Last line\r\n`
///
/// The reply code is taken from the last line.
///
/// # Errors
///
/// Returns an error if the reply is malformed.
pub fn parse_reply(lines: &[String]) -> Result<Reply> {
    let Some(last) = lines.last() else {
        return Err(Error::Protocol("Empty reply".into()));
    };

    let code = parse_code(last)?;

    let mut message = Vec::with_capacity(lines.len());
    for line in lines {
        check_line(line)?;
        message.push(line.get(4..).unwrap_or_default().to_string());
    }

    Ok(Reply {
        code: ReplyCode::new(code),
        lines: message,
        is_final: is_last_reply_line(last),
    })
}

/// Checks if a line is the last line of a (possibly multi-line) reply.
///
/// Multi-line replies use `-` after the code for continuation and ` ` for the last
/// line. A bare three-digit code also ends the reply.
#[must_use]
pub fn is_last_reply_line(line: &str) -> bool {
    let bytes = line.as_bytes();
    match bytes.len() {
        0..=2 => false,
        3 => bytes.iter().all(u8::is_ascii_digit),
        _ => bytes[3] == b' ',
    }
}

/// Checks one reply line: a three-digit code, then a space, a hyphen, or nothing.
///
/// # Errors
///
/// Returns [`Error::Protocol`] naming the offending line.
pub fn check_line(line: &str) -> Result<()> {
    parse_code(line)?;
    match line.as_bytes().get(3) {
        None | Some(b' ' | b'-') => Ok(()),
        Some(_) => Err(Error::Protocol(format!("Malformed reply line: {line}"))),
    }
}

fn parse_code(line: &str) -> Result<u16> {
    let code_str = line
        .get(0..3)
        .ok_or_else(|| Error::Protocol(format!("Reply too short: {line}")))?;
    if !code_str.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::Protocol(format!("Invalid reply code: {code_str}")));
    }
    code_str
        .parse::<u16>()
        .map_err(|_| Error::Protocol(format!("Invalid reply code: {code_str}")))
}
