//! SMTP connection management.
//!
//! This module provides:
//! - TLS/plaintext stream abstraction with implicit TLS and STARTTLS upgrade
//! - The [`Connector`] seam used by the transaction driver to open sockets
//! - [`Wire`], the buffered command/reply channel with bounded reads and writes

mod connector;
mod stream;
mod tls;
mod wire;

pub use connector::{Connector, DEFAULT_CONNECT_TIMEOUT, TcpConnector, UpgradeError};
pub use stream::{SmtpStream, connect_plain, connect_tls};
pub use tls::{TlsOptions, create_tls_connector, server_name};
pub use wire::{DEFAULT_IO_TIMEOUT, Wire};
