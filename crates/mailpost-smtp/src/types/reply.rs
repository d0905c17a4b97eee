//! SMTP reply types.

/// One logical SMTP reply, possibly assembled from several lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Reply code of the last line read.
    pub code: ReplyCode,
    /// Text of each line, with the code and separator stripped.
    pub lines: Vec<String>,
    /// Whether the last line read was a final (`<code><space>`) line.
    pub is_final: bool,
}

impl Reply {
    /// Creates a complete (final) reply.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Vec is not const-compatible
    pub fn new(code: ReplyCode, lines: Vec<String>) -> Self {
        Self {
            code,
            lines,
            is_final: true,
        }
    }

    /// Returns true if the reply carries exactly the given code.
    #[must_use]
    pub fn is(&self, code: ReplyCode) -> bool {
        self.code == code
    }

    /// Returns true if this is a success reply (2xx).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code.is_success()
    }

    /// Returns the reply text on one line, suitable for diagnostics.
    #[must_use]
    pub fn message_text(&self) -> String {
        self.lines.join(" ")
    }
}

impl std::fmt::Display for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code, self.message_text())
    }
}

/// SMTP reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReplyCode(u16);

impl ReplyCode {
    /// Creates a new reply code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Returns the numeric code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns true if this is a success code (2xx).
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    /// Returns true if this is an intermediate reply (3xx).
    #[must_use]
    pub const fn is_intermediate(self) -> bool {
        self.0 >= 300 && self.0 < 400
    }

    /// Returns true if this is a transient error (4xx).
    #[must_use]
    pub const fn is_transient(self) -> bool {
        self.0 >= 400 && self.0 < 500
    }

    /// Returns true if this is a permanent error (5xx).
    #[must_use]
    pub const fn is_permanent(self) -> bool {
        self.0 >= 500 && self.0 < 600
    }
}

impl std::fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Reply codes the submission transaction checks for
impl ReplyCode {
    /// 220 Service ready (greeting, STARTTLS go-ahead)
    pub const SERVICE_READY: Self = Self(220);
    /// 221 Service closing transmission channel
    pub const CLOSING: Self = Self(221);
    /// 235 Authentication succeeded
    pub const AUTH_SUCCESS: Self = Self(235);
    /// 250 Requested mail action okay, completed
    pub const OK: Self = Self(250);
    /// 334 Continue with authentication
    pub const AUTH_CONTINUE: Self = Self(334);
    /// 354 Start mail input
    pub const START_DATA: Self = Self(354);
    /// 535 Authentication credentials invalid
    pub const AUTH_FAILED: Self = Self(535);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod reply_code_tests {
        use super::*;

        #[test]
        fn classes() {
            assert!(ReplyCode::OK.is_success());
            assert!(ReplyCode::SERVICE_READY.is_success());
            assert!(ReplyCode::AUTH_CONTINUE.is_intermediate());
            assert!(ReplyCode::START_DATA.is_intermediate());
            assert!(ReplyCode::new(421).is_transient());
            assert!(ReplyCode::AUTH_FAILED.is_permanent());
        }

        #[test]
        fn display() {
            assert_eq!(format!("{}", ReplyCode::OK), "250");
            assert_eq!(ReplyCode::AUTH_SUCCESS.as_u16(), 235);
        }
    }

    mod reply_tests {
        use super::*;

        #[test]
        fn is_matches_exact_code() {
            let reply = Reply::new(ReplyCode::OK, vec!["OK".to_string()]);
            assert!(reply.is(ReplyCode::OK));
            assert!(!reply.is(ReplyCode::SERVICE_READY));
            assert!(reply.is_final);
        }

        #[test]
        fn message_text_joins_lines() {
            let reply = Reply::new(
                ReplyCode::OK,
                vec!["smtp.example.com".to_string(), "PIPELINING".to_string()],
            );
            assert_eq!(reply.message_text(), "smtp.example.com PIPELINING");
            assert_eq!(reply.to_string(), "250 smtp.example.com PIPELINING");
        }

        #[test]
        fn message_text_empty() {
            let reply = Reply::new(ReplyCode::OK, vec![]);
            assert_eq!(reply.message_text(), "");
        }
    }
}
