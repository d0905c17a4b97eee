//! SASL authentication: PLAIN with fallback to LOGIN.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, trace};

use crate::command::Command;
use crate::error::{AuthError, Error, Result};
use crate::logger::Logger;
use crate::session::Session;
use crate::types::{AuthMechanism, Reply, ReplyCode};

/// Submission credentials.
///
/// `Debug` never prints the password, and the username only by length.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Credentials {
    /// Login name, usually the mailbox address.
    pub username: String,
    /// Password or app password.
    pub password: String,
    /// Whether the server must be authenticated against before `MAIL FROM`.
    pub required: bool,
}

impl Credentials {
    /// Credentials that will be presented to the server.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            required: true,
        }
    }

    /// No authentication (open relay or IP-authorized submission).
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username_len", &self.username.len())
            .field("password", &"<redacted>")
            .field("required", &self.required)
            .finish()
    }
}

/// Authenticates the session, returning the mechanism used.
///
/// Returns `Ok(None)` without touching the wire when authentication is not
/// required. Otherwise `AUTH PLAIN` is tried first; only a non-`334` answer to
/// the initial `AUTH PLAIN` line falls back to `AUTH LOGIN`.
///
/// # Errors
///
/// Returns [`AuthError::NoSupportedMechanism`] if neither mechanism is accepted,
/// [`AuthError::CredentialsRejected`] when the server refuses the credentials, and
/// [`AuthError::Aborted`] for any other answer mid-exchange.
pub async fn authenticate<S>(
    session: &mut Session<S>,
    credentials: &Credentials,
    logger: &dyn Logger,
) -> Result<Option<AuthMechanism>>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    if !credentials.required {
        debug!("authentication not required");
        return Ok(None);
    }
    if !session.is_tls() {
        logger.warning("Authenticating over an unencrypted connection");
    }

    let reply = session
        .command(&Command::Auth {
            mechanism: AuthMechanism::Plain,
        })
        .await?;
    if reply.is(ReplyCode::AUTH_CONTINUE) {
        auth_plain(session, credentials).await?;
        return Ok(Some(AuthMechanism::Plain));
    }
    logger.warning(&format!(
        "AUTH PLAIN not accepted ({}), falling back to AUTH LOGIN",
        reply.code
    ));

    let reply = session
        .command(&Command::Auth {
            mechanism: AuthMechanism::Login,
        })
        .await?;
    if reply.is(ReplyCode::AUTH_CONTINUE) {
        auth_login(session, credentials).await?;
        return Ok(Some(AuthMechanism::Login));
    }

    Err(AuthError::NoSupportedMechanism.into())
}

async fn auth_plain<S>(session: &mut Session<S>, credentials: &Credentials) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let encoded = plain_response(&credentials.username, &credentials.password);
    trace!(len = encoded.len(), "sending PLAIN response");
    let reply = session.secret(&encoded).await?;
    finish(AuthMechanism::Plain, "response", reply)
}

async fn auth_login<S>(session: &mut Session<S>, credentials: &Credentials) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let user = STANDARD.encode(credentials.username.as_bytes());
    trace!(len = user.len(), "sending LOGIN username");
    let reply = session.secret(&user).await?;
    if reply.is(ReplyCode::AUTH_FAILED) {
        return Err(rejected(AuthMechanism::Login, &reply));
    }
    if !reply.is(ReplyCode::AUTH_CONTINUE) {
        return Err(aborted(AuthMechanism::Login, "username", &reply));
    }

    let pass = STANDARD.encode(credentials.password.as_bytes());
    trace!(len = pass.len(), "sending LOGIN password");
    let reply = session.secret(&pass).await?;
    finish(AuthMechanism::Login, "password", reply)
}

/// Builds the RFC 4616 PLAIN response: base64 of `\0username\0password`.
#[must_use]
pub fn plain_response(username: &str, password: &str) -> String {
    let credentials = format!("\0{username}\0{password}");
    STANDARD.encode(credentials.as_bytes())
}

fn finish(mechanism: AuthMechanism, stage: &'static str, reply: Reply) -> Result<()> {
    if reply.is(ReplyCode::AUTH_SUCCESS) {
        Ok(())
    } else if reply.is(ReplyCode::AUTH_FAILED) {
        Err(rejected(mechanism, &reply))
    } else {
        Err(aborted(mechanism, stage, &reply))
    }
}

fn rejected(mechanism: AuthMechanism, reply: &Reply) -> Error {
    AuthError::CredentialsRejected {
        mechanism,
        code: reply.code.as_u16(),
        text: reply.message_text(),
    }
    .into()
}

fn aborted(mechanism: AuthMechanism, stage: &'static str, reply: &Reply) -> Error {
    AuthError::Aborted {
        mechanism,
        stage,
        code: reply.code.as_u16(),
        text: reply.message_text(),
    }
    .into()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::connection::DEFAULT_IO_TIMEOUT;
    use crate::logger::TracingLogger;
    use tokio_test::io::Builder;

    fn credentials() -> Credentials {
        Credentials::new("user", "pass")
    }

    fn session(mock: tokio_test::io::Mock) -> Session<tokio_test::io::Mock> {
        Session::new(mock, DEFAULT_IO_TIMEOUT, true)
    }

    #[test]
    fn test_plain_response() {
        assert_eq!(plain_response("user", "pass"), "AHVzZXIAcGFzcw==");
    }

    #[test]
    fn test_debug_redacts() {
        let rendered = format!("{:?}", Credentials::new("alice@example.com", "hunter2"));
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("alice"));
    }

    #[tokio::test]
    async fn test_skipped_when_not_required() {
        let mut session = session(Builder::new().build());
        let used = authenticate(&mut session, &Credentials::none(), &TracingLogger)
            .await
            .unwrap();
        assert_eq!(used, None);
    }

    #[tokio::test]
    async fn test_plain_success() {
        let mock = Builder::new()
            .write(b"AUTH PLAIN\r\n")
            .read(b"334 \r\n")
            .write(b"AHVzZXIAcGFzcw==\r\n")
            .read(b"235 2.7.0 Accepted\r\n")
            .build();
        let used = authenticate(&mut session(mock), &credentials(), &TracingLogger)
            .await
            .unwrap();
        assert_eq!(used, Some(AuthMechanism::Plain));
    }

    #[derive(Default)]
    struct Warnings(std::sync::Mutex<Vec<String>>);

    impl Logger for Warnings {
        fn log(&self, level: crate::logger::Level, message: &str) {
            if level == crate::logger::Level::Warning {
                self.0.lock().unwrap().push(message.to_string());
            }
        }
    }

    #[tokio::test]
    async fn test_plaintext_session_warns_before_credentials() {
        let mock = Builder::new()
            .write(b"AUTH PLAIN\r\n")
            .read(b"334 \r\n")
            .write(b"AHVzZXIAcGFzcw==\r\n")
            .read(b"235 2.7.0 Accepted\r\n")
            .build();
        let warnings = Warnings::default();
        let mut plaintext = Session::new(mock, DEFAULT_IO_TIMEOUT, false);

        authenticate(&mut plaintext, &credentials(), &warnings)
            .await
            .unwrap();

        let warnings = warnings.0.lock().unwrap();
        assert_eq!(
            *warnings,
            vec!["Authenticating over an unencrypted connection".to_string()]
        );
    }

    #[tokio::test]
    async fn test_plain_rejection_does_not_fall_back() {
        let mock = Builder::new()
            .write(b"AUTH PLAIN\r\n")
            .read(b"334 \r\n")
            .write(b"AHVzZXIAcGFzcw==\r\n")
            .read(b"535 5.7.8 Username and Password not accepted\r\n")
            .build();
        let err = authenticate(&mut session(mock), &credentials(), &TracingLogger)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Auth(AuthError::CredentialsRejected {
                mechanism: AuthMechanism::Plain,
                code: 535,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_login_fallback() {
        let mock = Builder::new()
            .write(b"AUTH PLAIN\r\n")
            .read(b"504 5.5.4 Unrecognized authentication type\r\n")
            .write(b"AUTH LOGIN\r\n")
            .read(b"334 VXNlcm5hbWU6\r\n")
            .write(b"dXNlcg==\r\n")
            .read(b"334 UGFzc3dvcmQ6\r\n")
            .write(b"cGFzcw==\r\n")
            .read(b"235 Authentication successful\r\n")
            .build();
        let used = authenticate(&mut session(mock), &credentials(), &TracingLogger)
            .await
            .unwrap();
        assert_eq!(used, Some(AuthMechanism::Login));
    }

    #[tokio::test]
    async fn test_login_username_rejected() {
        let mock = Builder::new()
            .write(b"AUTH PLAIN\r\n")
            .read(b"504 Unrecognized\r\n")
            .write(b"AUTH LOGIN\r\n")
            .read(b"334 VXNlcm5hbWU6\r\n")
            .write(b"dXNlcg==\r\n")
            .read(b"535 Authentication credentials invalid\r\n")
            .build();
        let err = authenticate(&mut session(mock), &credentials(), &TracingLogger)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Auth(AuthError::CredentialsRejected {
                mechanism: AuthMechanism::Login,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_login_unexpected_code_aborts() {
        let mock = Builder::new()
            .write(b"AUTH PLAIN\r\n")
            .read(b"504 Unrecognized\r\n")
            .write(b"AUTH LOGIN\r\n")
            .read(b"334 VXNlcm5hbWU6\r\n")
            .write(b"dXNlcg==\r\n")
            .read(b"454 Temporary failure\r\n")
            .build();
        let err = authenticate(&mut session(mock), &credentials(), &TracingLogger)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Auth(AuthError::Aborted {
                stage: "username",
                code: 454,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_no_supported_mechanism() {
        let mock = Builder::new()
            .write(b"AUTH PLAIN\r\n")
            .read(b"504 Unrecognized\r\n")
            .write(b"AUTH LOGIN\r\n")
            .read(b"504 Unrecognized\r\n")
            .build();
        let err = authenticate(&mut session(mock), &credentials(), &TracingLogger)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::NoSupportedMechanism)));
        assert!(!err.to_string().contains("pass"));
    }
}
