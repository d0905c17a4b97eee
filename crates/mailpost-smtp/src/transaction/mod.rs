//! Transaction driver: one connection, one message, one close.

mod message;

pub use message::{Envelope, encode_data};

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument};

use crate::auth::{Credentials, authenticate};
use crate::command::Command;
use crate::connection::{Connector, DEFAULT_IO_TIMEOUT};
use crate::error::Result;
use crate::logger::{Logger, TracingLogger};
use crate::security::{SecurityMode, ServerEndpoint, start_tls};
use crate::session::{Session, require};
use crate::types::{Capabilities, ReplyCode, Step};

/// Default EHLO identity.
pub const DEFAULT_CLIENT_NAME: &str = "localhost";

/// Outcome of an accepted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    /// Server text of the final `250` (usually a queue identifier).
    pub reply: String,
}

/// Submits single messages to one configured server.
///
/// Every call to [`send`](Self::send) opens its own connection and closes it
/// before returning, on success and on every failure path.
pub struct SmtpTransaction<C> {
    connector: C,
    endpoint: ServerEndpoint,
    credentials: Credentials,
    client_name: String,
    io_timeout: Duration,
    logger: Arc<dyn Logger>,
}

impl<C: Connector> SmtpTransaction<C> {
    /// Creates a transaction without credentials, logging through `tracing`.
    pub fn new(connector: C, endpoint: ServerEndpoint) -> Self {
        Self {
            connector,
            endpoint,
            credentials: Credentials::none(),
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            io_timeout: DEFAULT_IO_TIMEOUT,
            logger: Arc::new(TracingLogger),
        }
    }

    /// Sets the credentials (and whether authentication is required).
    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Sets the name announced in `EHLO`.
    #[must_use]
    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    /// Sets the bound on each read and write.
    #[must_use]
    pub const fn io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Sets the diagnostic sink.
    #[must_use]
    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Returns the resolved server endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &ServerEndpoint {
        &self.endpoint
    }

    /// Validates the fields and sends one message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`](crate::Error::InvalidAddress) before any
    /// connection is made if either address is malformed, otherwise whatever
    /// [`send_envelope`](Self::send_envelope) returns.
    pub async fn send(&self, from: &str, to: &str, subject: &str, body: &str) -> Result<Sent> {
        let envelope = match Envelope::new(from, to, subject, body) {
            Ok(envelope) => envelope,
            Err(err) => {
                self.logger.error(&err.to_string());
                return Err(err);
            }
        };
        self.send_envelope(&envelope).await
    }

    /// Sends one already validated message.
    ///
    /// The diagnostic of a failure is logged at error level before it is returned.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error; see [`Error::kind`](crate::Error::kind).
    #[instrument(skip_all, fields(endpoint = %self.endpoint, to = %envelope.to))]
    pub async fn send_envelope(&self, envelope: &Envelope) -> Result<Sent> {
        self.logger
            .info(&format!("Connecting to {}", self.endpoint));

        let result = self.run(envelope).await;
        match &result {
            Ok(sent) => self.logger.success(&format!(
                "Email sent successfully to {} ({})",
                envelope.to, sent.reply
            )),
            Err(err) => self.logger.error(&format!("Failed to send email: {err}")),
        }
        result
    }

    async fn run(&self, envelope: &Envelope) -> Result<Sent> {
        let stream = self.connector.connect(&self.endpoint).await?;
        let tls = self.endpoint.security == SecurityMode::ImplicitTls;
        let mut session = Session::new(stream, self.io_timeout, tls);

        let result = self.drive(&mut session, envelope).await;
        session.close().await;
        result
    }

    async fn drive(&self, session: &mut Session<C::Stream>, envelope: &Envelope) -> Result<Sent> {
        let greeting = require(session.read_reply().await?, Step::Connect, ReplyCode::SERVICE_READY)?;
        self.logger.info(&format!("Connected: {greeting}"));

        let capabilities = self.ehlo(session).await?;

        if self.endpoint.security == SecurityMode::StartTls {
            if !capabilities.supports_starttls() {
                self.logger
                    .warning("Server did not advertise STARTTLS, attempting upgrade anyway");
            }
            start_tls(session, &self.connector, &self.endpoint.host).await?;
            self.logger.info("TLS encryption established");

            let capabilities = self.ehlo(session).await?;
            debug!(extensions = capabilities.extensions.len(), "capabilities after STARTTLS");
        }

        if let Some(mechanism) = authenticate(session, &self.credentials, &*self.logger).await? {
            self.logger
                .info(&format!("Authenticated using AUTH {mechanism}"));
        }

        session
            .expect(
                &Command::MailFrom {
                    from: envelope.from.clone(),
                },
                Step::SetSender,
                ReplyCode::OK,
            )
            .await?;
        self.logger
            .info(&format!("Sender accepted: {}", envelope.from));

        session
            .expect(
                &Command::RcptTo {
                    to: envelope.to.clone(),
                },
                Step::SetRecipient,
                ReplyCode::OK,
            )
            .await?;
        self.logger
            .info(&format!("Recipient accepted: {}", envelope.to));

        session
            .expect(&Command::Data, Step::OpenData, ReplyCode::START_DATA)
            .await?;
        self.logger.info("Server ready for message data");

        let accepted = session.data(&envelope.to_data(), ReplyCode::OK).await?;
        self.logger
            .info(&format!("Message accepted: {}", accepted.message_text()));

        if let Err(err) = session.command(&Command::Quit).await {
            debug!(error = %err, "QUIT failed after delivery");
        }

        Ok(Sent {
            reply: accepted.message_text(),
        })
    }

    /// Sends `EHLO`; the reply is informational, so any code is accepted.
    async fn ehlo(&self, session: &mut Session<C::Stream>) -> Result<Capabilities> {
        let reply = session
            .command(&Command::Ehlo {
                hostname: self.client_name.clone(),
            })
            .await?;
        if reply.is_success() {
            let capabilities = Capabilities::from_ehlo(&reply.lines);
            debug!(
                server = %capabilities.hostname,
                starttls = capabilities.supports_starttls(),
                auth = ?capabilities.auth_mechanisms(),
                "EHLO accepted"
            );
            Ok(capabilities)
        } else {
            self.logger
                .warning(&format!("EHLO not accepted: {reply}"));
            Ok(Capabilities::default())
        }
    }
}

impl<C> std::fmt::Debug for SmtpTransaction<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpTransaction")
            .field("endpoint", &self.endpoint)
            .field("credentials", &self.credentials)
            .field("client_name", &self.client_name)
            .field("io_timeout", &self.io_timeout)
            .finish_non_exhaustive()
    }
}
