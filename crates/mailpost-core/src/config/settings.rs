//! Resolved submission settings.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mailpost_smtp::connection::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_IO_TIMEOUT};
use mailpost_smtp::transaction::DEFAULT_CLIENT_NAME;
use mailpost_smtp::{Credentials, SecurityMode, ServerEndpoint, TlsOptions};

use super::{ConfigError, ConfigResult, EnvFile};

/// Configuration keys.
pub mod keys {
    /// Server hostname.
    pub const HOST: &str = "SMTP_HOST";
    /// Server port.
    pub const PORT: &str = "SMTP_PORT";
    /// Login name.
    pub const USERNAME: &str = "SMTP_USERNAME";
    /// Password.
    pub const PASSWORD: &str = "SMTP_PASSWORD";
    /// `starttls`, `ssl`, or `none`.
    pub const SECURITY: &str = "SMTP_SECURITY";
    /// `true`/`1` to authenticate.
    pub const REQUIRE_AUTH: &str = "SMTP_REQUIRE_AUTH";
    /// EHLO identity.
    pub const CLIENT_NAME: &str = "SMTP_CLIENT_NAME";
    /// `true`/`1` to skip certificate verification.
    pub const TLS_ACCEPT_INVALID_CERTS: &str = "SMTP_TLS_ACCEPT_INVALID_CERTS";
    /// Connection timeout in seconds.
    pub const CONNECT_TIMEOUT: &str = "SMTP_CONNECT_TIMEOUT";
    /// Read/write timeout in seconds.
    pub const TIMEOUT: &str = "SMTP_TIMEOUT";
    /// Directory for daily log files.
    pub const LOG_DIR: &str = "SMTP_LOG_DIR";
}

/// Default server.
pub const DEFAULT_HOST: &str = "smtp.gmail.com";
/// Default submission port.
pub const DEFAULT_PORT: u16 = 587;
/// Default log directory.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Everything needed to submit mail, resolved from key/value configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Server and resolved security mode.
    pub endpoint: ServerEndpoint,
    /// Credentials and whether they are used.
    pub credentials: Credentials,
    /// Name announced in `EHLO`.
    pub client_name: String,
    /// Certificate verification options.
    pub tls: TlsOptions,
    /// Bound on connection establishment.
    pub connect_timeout: Duration,
    /// Bound on each read and write.
    pub io_timeout: Duration,
    /// Directory for daily log files.
    pub log_dir: PathBuf,
}

impl Settings {
    /// Resolves settings from a key lookup. Empty values count as absent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a malformed port, security mode,
    /// or timeout, and [`ConfigError::Missing`] when authentication is required
    /// but the username or password is empty.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let host = get(keys::HOST).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match get(keys::PORT) {
            Some(value) => parse_port(&value)?,
            None => DEFAULT_PORT,
        };
        let security = get(keys::SECURITY)
            .map(|value| {
                value
                    .parse::<SecurityMode>()
                    .map_err(|_| ConfigError::InvalidValue {
                        key: keys::SECURITY,
                        value,
                        reason: "expected starttls, ssl or none",
                    })
            })
            .transpose()?;
        let endpoint = ServerEndpoint::resolve(host, port, security);

        let required = get(keys::REQUIRE_AUTH).is_none_or(|value| is_truthy(&value));
        let credentials = if required {
            let username = get(keys::USERNAME).ok_or(ConfigError::Missing {
                key: keys::USERNAME,
                required_by: keys::REQUIRE_AUTH,
            })?;
            let password = lookup(keys::PASSWORD)
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::Missing {
                    key: keys::PASSWORD,
                    required_by: keys::REQUIRE_AUTH,
                })?;
            Credentials::new(username, password)
        } else {
            Credentials::none()
        };

        let tls = TlsOptions {
            accept_invalid_certs: get(keys::TLS_ACCEPT_INVALID_CERTS)
                .is_some_and(|value| is_truthy(&value)),
        };

        let connect_timeout = match get(keys::CONNECT_TIMEOUT) {
            Some(value) => parse_seconds(keys::CONNECT_TIMEOUT, value)?,
            None => DEFAULT_CONNECT_TIMEOUT,
        };
        let io_timeout = match get(keys::TIMEOUT) {
            Some(value) => parse_seconds(keys::TIMEOUT, value)?,
            None => DEFAULT_IO_TIMEOUT,
        };

        Ok(Self {
            endpoint,
            credentials,
            client_name: get(keys::CLIENT_NAME).unwrap_or_else(|| DEFAULT_CLIENT_NAME.to_string()),
            tls,
            connect_timeout,
            io_timeout,
            log_dir: get(keys::LOG_DIR).map_or_else(|| PathBuf::from(DEFAULT_LOG_DIR), PathBuf::from),
        })
    }

    /// Resolves settings from a map.
    ///
    /// # Errors
    ///
    /// See [`Settings::from_lookup`].
    pub fn from_map(map: &HashMap<String, String>) -> ConfigResult<Self> {
        Self::from_lookup(|key| map.get(key).cloned())
    }

    /// Resolves settings from the process environment.
    ///
    /// # Errors
    ///
    /// See [`Settings::from_lookup`].
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads a `.env` file and resolves settings from it, with process
    /// environment variables taking precedence over the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or unreadable, or see
    /// [`Settings::from_lookup`].
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let file = EnvFile::load(path)?;
        Self::from_lookup(|key| {
            std::env::var(key)
                .ok()
                .or_else(|| file.get(key).map(str::to_string))
        })
    }
}

fn is_truthy(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

fn parse_port(value: &str) -> ConfigResult<u16> {
    match value.parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(ConfigError::InvalidValue {
            key: keys::PORT,
            value: value.to_string(),
            reason: "expected a port number between 1 and 65535",
        }),
    }
}

fn parse_seconds(key: &'static str, value: String) -> ConfigResult<Duration> {
    match value.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidValue {
            key,
            value,
            reason: "expected a positive number of seconds",
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> ConfigResult<Settings> {
        let map = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Settings::from_map(&map)
    }

    const AUTH: [(&str, &str); 2] = [(keys::USERNAME, "me@example.com"), (keys::PASSWORD, "secret")];

    #[test]
    fn test_defaults() {
        let s = settings(&AUTH).unwrap();
        assert_eq!(s.endpoint.host, "smtp.gmail.com");
        assert_eq!(s.endpoint.port, 587);
        assert_eq!(s.endpoint.security, SecurityMode::StartTls);
        assert!(s.credentials.required);
        assert_eq!(s.client_name, "localhost");
        assert!(!s.tls.accept_invalid_certs);
        assert_eq!(s.connect_timeout, Duration::from_secs(30));
        assert_eq!(s.io_timeout, Duration::from_secs(60));
        assert_eq!(s.log_dir, PathBuf::from("logs"));
    }

    #[test]
    fn test_security_from_port() {
        let mut pairs = AUTH.to_vec();
        pairs.push((keys::PORT, "465"));
        assert_eq!(settings(&pairs).unwrap().endpoint.security, SecurityMode::ImplicitTls);
    }

    #[test]
    fn test_port_corrections() {
        let s = settings(&[
            (keys::PORT, "465"),
            (keys::SECURITY, "starttls"),
            (keys::REQUIRE_AUTH, "false"),
        ])
        .unwrap();
        assert_eq!(s.endpoint.security, SecurityMode::ImplicitTls);

        let s = settings(&[
            (keys::PORT, "25"),
            (keys::SECURITY, "ssl"),
            (keys::REQUIRE_AUTH, "false"),
        ])
        .unwrap();
        assert_eq!(s.endpoint.security, SecurityMode::StartTls);
    }

    #[test]
    fn test_invalid_security_is_fatal() {
        let err = settings(&[(keys::SECURITY, "tls"), (keys::REQUIRE_AUTH, "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "SMTP_SECURITY", .. }));
    }

    #[test]
    fn test_invalid_port_is_fatal() {
        for port in ["0", "70000", "smtp"] {
            let err = settings(&[(keys::PORT, port), (keys::REQUIRE_AUTH, "0")]).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { key: "SMTP_PORT", .. }), "{port}");
        }
    }

    #[test]
    fn test_require_auth_truthiness() {
        for value in ["true", "TRUE", "1"] {
            let mut pairs = AUTH.to_vec();
            pairs.push((keys::REQUIRE_AUTH, value));
            assert!(settings(&pairs).unwrap().credentials.required, "{value}");
        }
        for value in ["false", "0", "yes", "on"] {
            let s = settings(&[(keys::REQUIRE_AUTH, value)]).unwrap();
            assert!(!s.credentials.required, "{value}");
            assert!(s.credentials.username.is_empty());
        }
    }

    #[test]
    fn test_missing_credentials_are_fatal() {
        let err = settings(&[(keys::USERNAME, "me@example.com")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { key: "SMTP_PASSWORD", .. }));

        let err = settings(&[(keys::PASSWORD, "secret")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { key: "SMTP_USERNAME", .. }));
    }

    #[test]
    fn test_password_not_trimmed() {
        let s = settings(&[(keys::USERNAME, "me"), (keys::PASSWORD, " pass word ")]).unwrap();
        assert_eq!(s.credentials.password, " pass word ");
    }

    #[test]
    fn test_timeouts() {
        let mut pairs = AUTH.to_vec();
        pairs.extend([(keys::CONNECT_TIMEOUT, "5"), (keys::TIMEOUT, "10")]);
        let s = settings(&pairs).unwrap();
        assert_eq!(s.connect_timeout, Duration::from_secs(5));
        assert_eq!(s.io_timeout, Duration::from_secs(10));

        for bad in ["0", "-1", "soon"] {
            let mut pairs = AUTH.to_vec();
            pairs.push((keys::TIMEOUT, bad));
            assert!(settings(&pairs).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_empty_values_use_defaults() {
        let mut pairs = AUTH.to_vec();
        pairs.extend([(keys::HOST, ""), (keys::SECURITY, " "), (keys::PORT, "")]);
        let s = settings(&pairs).unwrap();
        assert_eq!(s.endpoint.host, DEFAULT_HOST);
        assert_eq!(s.endpoint.security, SecurityMode::StartTls);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let pairs = [
            (keys::HOST, "mail.example.net"),
            (keys::PORT, "2525"),
            (keys::SECURITY, "none"),
            (keys::USERNAME, "me"),
            (keys::PASSWORD, "secret"),
            (keys::TLS_ACCEPT_INVALID_CERTS, "1"),
        ];
        let a = settings(&pairs).unwrap();
        let b = settings(&pairs).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.endpoint.security, SecurityMode::Plain);
        assert!(a.tls.accept_invalid_certs);
    }

    #[test]
    fn test_load_from_env_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "# local relay\nSMTP_HOST=relay.internal.test\nSMTP_PORT=2525\nSMTP_REQUIRE_AUTH=false\n",
        )
        .unwrap();

        let s = Settings::load(&path).unwrap();
        assert_eq!(s.endpoint.host, "relay.internal.test");
        assert_eq!(s.endpoint.port, 2525);
        assert!(!s.credentials.required);
    }

    #[test]
    fn test_load_missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(dir.path().join(".env")).unwrap_err();
        assert!(matches!(err, ConfigError::EnvFileNotFound { .. }));
    }
}
