//! # mailpost-core
//!
//! Everything around the SMTP transaction that a front end needs:
//! - `.env` parsing and settings resolution
//! - Daily log files
//! - [`Mailer`], which sends one message per call

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
mod error;
pub mod logging;
mod mailer;

pub use config::{ConfigError, EnvFile, Settings};
pub use error::{Error, Result};
pub use logging::{FileLogger, MultiLogger};
pub use mailer::Mailer;
pub use mailpost_smtp::{Level, Logger, Sent, TracingLogger};
