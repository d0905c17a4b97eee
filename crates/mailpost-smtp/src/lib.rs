//! # mailpost-smtp
//!
//! An SMTP submission client for sending one plain-text message per
//! connection (RFC 5321).
//!
//! ## Features
//!
//! - **Connection security**: implicit TLS (port 465), STARTTLS, or plaintext,
//!   with the mode corrected for ports that only speak one of them
//! - **Authentication**: AUTH PLAIN with fallback to AUTH LOGIN
//! - **Typed failures**: every error names the step that failed and the
//!   server's reply
//! - **Exactly-once close**: the socket is shut down once on every exit path
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailpost_smtp::{Credentials, ServerEndpoint, SmtpTransaction, TcpConnector};
//!
//! #[tokio::main]
//! async fn main() -> mailpost_smtp::Result<()> {
//!     let endpoint = ServerEndpoint::resolve("smtp.example.com", 587, None);
//!     let transaction = SmtpTransaction::new(TcpConnector::new(), endpoint)
//!         .credentials(Credentials::new("user@example.com", "app-password"));
//!
//!     let sent = transaction
//!         .send("user@example.com", "friend@example.org", "Hello", "Hi there")
//!         .await?;
//!     println!("queued: {}", sent.reply);
//!     Ok(())
//! }
//! ```
//!
//! ## Transaction
//!
//! ```text
//! greeting ─→ EHLO ─→ [STARTTLS ─→ EHLO] ─→ [AUTH] ─→ MAIL FROM ─→ RCPT TO ─→ DATA ─→ QUIT
//! ```
//!
//! ## Modules
//!
//! - [`auth`]: SASL PLAIN and LOGIN
//! - [`command`]: SMTP command serialization
//! - [`connection`]: sockets, TLS, and the line-level wire
//! - [`parser`]: reply parser
//! - [`security`]: security mode resolution and STARTTLS
//! - [`transaction`]: the driver and message composition
//! - [`types`]: addresses, replies, capabilities, steps

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod auth;
pub mod command;
pub mod connection;
mod error;
pub mod logger;
pub mod parser;
pub mod security;
pub mod session;
pub mod transaction;
pub mod types;

pub use auth::Credentials;
pub use connection::{Connector, TcpConnector, TlsOptions, UpgradeError};
pub use error::{AuthError, Error, ErrorKind, Result};
pub use logger::{Level, Logger, TracingLogger};
pub use security::{SecurityMode, ServerEndpoint};
pub use transaction::{Envelope, Sent, SmtpTransaction};
pub use types::{Address, AuthMechanism, Reply, ReplyCode, Step};
