//! EHLO capability types.

/// Capability advertised in an EHLO reply.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Extension {
    /// STARTTLS - TLS upgrade
    StartTls,
    /// AUTH - Authentication
    Auth(Vec<AuthMechanism>),
    /// SIZE - Maximum message size
    Size(Option<usize>),
    /// 8BITMIME - 8-bit MIME transport
    EightBitMime,
    /// Anything else; kept verbatim for diagnostics
    Unknown(String),
}

impl Extension {
    /// Parses an extension line from an EHLO reply.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            return Self::Unknown(line.to_string());
        }

        let keyword = parts[0].to_uppercase();
        match keyword.as_str() {
            "STARTTLS" => Self::StartTls,
            "AUTH" => {
                let mechanisms = parts[1..]
                    .iter()
                    .filter_map(|m| AuthMechanism::parse(m))
                    .collect();
                Self::Auth(mechanisms)
            }
            "SIZE" => Self::Size(parts.get(1).and_then(|s| s.parse().ok())),
            "8BITMIME" => Self::EightBitMime,
            _ => Self::Unknown(line.to_string()),
        }
    }
}

/// Capabilities read from the latest EHLO reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Server identity from the first EHLO line.
    pub hostname: String,
    /// Advertised extensions, in reply order.
    pub extensions: Vec<Extension>,
}

impl Capabilities {
    /// Builds capabilities from EHLO reply lines (the first line is the server identity).
    #[must_use]
    pub fn from_ehlo(lines: &[String]) -> Self {
        let hostname = lines
            .first()
            .and_then(|line| line.split_whitespace().next())
            .unwrap_or_default()
            .to_string();
        let extensions = lines.iter().skip(1).map(|l| Extension::parse(l)).collect();
        Self {
            hostname,
            extensions,
        }
    }

    /// Checks if STARTTLS is advertised.
    #[must_use]
    pub fn supports_starttls(&self) -> bool {
        self.extensions.contains(&Extension::StartTls)
    }

    /// Returns advertised authentication mechanisms.
    #[must_use]
    pub fn auth_mechanisms(&self) -> &[AuthMechanism] {
        self.extensions
            .iter()
            .find_map(|ext| match ext {
                Extension::Auth(mechanisms) => Some(mechanisms.as_slice()),
                _ => None,
            })
            .unwrap_or_default()
    }
}

/// SASL mechanisms this client speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMechanism {
    /// PLAIN - RFC 4616
    Plain,
    /// LOGIN - legacy username/password prompts
    Login,
}

impl AuthMechanism {
    /// Parses an authentication mechanism name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PLAIN" => Some(Self::Plain),
            "LOGIN" => Some(Self::Login),
            _ => None,
        }
    }

    /// Returns the mechanism name as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::Login => "LOGIN",
        }
    }
}

impl std::fmt::Display for AuthMechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_starttls_any_case() {
        assert_eq!(Extension::parse("STARTTLS"), Extension::StartTls);
        assert_eq!(Extension::parse("starttls"), Extension::StartTls);
    }

    #[test]
    fn parse_auth_ignores_unknown_mechanisms() {
        assert_eq!(
            Extension::parse("AUTH PLAIN LOGIN XOAUTH2"),
            Extension::Auth(vec![AuthMechanism::Plain, AuthMechanism::Login])
        );
    }

    #[test]
    fn parse_size() {
        assert_eq!(
            Extension::parse("SIZE 35882577"),
            Extension::Size(Some(35_882_577))
        );
        assert_eq!(Extension::parse("SIZE"), Extension::Size(None));
    }

    #[test]
    fn parse_unknown_and_empty() {
        assert_eq!(
            Extension::parse("CHUNKING"),
            Extension::Unknown("CHUNKING".into())
        );
        assert!(matches!(Extension::parse(""), Extension::Unknown(_)));
    }

    #[test]
    fn capabilities_from_ehlo() {
        let lines = vec![
            "smtp.gmail.com at your service, [203.0.113.9]".to_string(),
            "SIZE 35882577".to_string(),
            "8BITMIME".to_string(),
            "STARTTLS".to_string(),
            "AUTH LOGIN PLAIN".to_string(),
        ];
        let caps = Capabilities::from_ehlo(&lines);
        assert_eq!(caps.hostname, "smtp.gmail.com");
        assert!(caps.supports_starttls());
        assert_eq!(
            caps.auth_mechanisms(),
            &[AuthMechanism::Login, AuthMechanism::Plain]
        );
    }

    #[test]
    fn capabilities_without_auth() {
        let caps = Capabilities::from_ehlo(&["mx.example.org".to_string()]);
        assert!(!caps.supports_starttls());
        assert!(caps.auth_mechanisms().is_empty());
    }
}
