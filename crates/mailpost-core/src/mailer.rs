//! Send façade used by front ends.

use std::sync::Arc;

use mailpost_smtp::{Connector, Logger, Sent, SmtpTransaction, TcpConnector};
use tracing::debug;

use crate::config::Settings;
use crate::error::{Error, Result};

/// Sends single messages with fixed settings.
///
/// Each [`send`](Self::send) opens its own connection; a `Mailer` can be shared
/// between tasks.
pub struct Mailer<C = TcpConnector> {
    transaction: SmtpTransaction<C>,
    logger: Arc<dyn Logger>,
}

impl Mailer<TcpConnector> {
    /// Creates a mailer over real TCP/TLS sockets.
    #[must_use]
    pub fn new(settings: &Settings, logger: Arc<dyn Logger>) -> Self {
        let connector = TcpConnector::new()
            .tls(settings.tls)
            .connect_timeout(settings.connect_timeout);
        Self::with_connector(connector, settings, logger)
    }
}

impl<C: Connector> Mailer<C> {
    /// Creates a mailer over a custom connector.
    pub fn with_connector(connector: C, settings: &Settings, logger: Arc<dyn Logger>) -> Self {
        if settings.tls.accept_invalid_certs {
            logger.warning("TLS certificate verification is disabled");
        }
        let transaction = SmtpTransaction::new(connector, settings.endpoint.clone())
            .credentials(settings.credentials.clone())
            .client_name(settings.client_name.clone())
            .io_timeout(settings.io_timeout)
            .logger(Arc::clone(&logger));
        Self {
            transaction,
            logger,
        }
    }

    /// Sends one message.
    ///
    /// All four fields must be non-empty after trimming; otherwise nothing is
    /// sent and no connection is opened.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFields`] for an empty field, or [`Error::Smtp`]
    /// carrying the failed step and server reply.
    pub async fn send(&self, from: &str, to: &str, subject: &str, body: &str) -> Result<Sent> {
        if [from, to, subject, body].iter().any(|field| field.trim().is_empty()) {
            self.logger.warning("Rejected submission with empty fields");
            return Err(Error::MissingFields);
        }

        debug!(endpoint = %self.transaction.endpoint(), "submitting message");
        Ok(self.transaction.send(from, to, subject, body).await?)
    }
}

impl<C> std::fmt::Debug for Mailer<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailer")
            .field("transaction", &self.transaction)
            .finish_non_exhaustive()
    }
}
