//! Leveled diagnostic sink the transaction reports its progress to.

use std::sync::Arc;

/// Severity of a diagnostic line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Level {
    /// Progress through the transaction.
    Info,
    /// The message was accepted for delivery.
    Success,
    /// Something unusual that did not stop the send.
    Warning,
    /// The send failed.
    Error,
}

impl Level {
    /// Returns the level tag written in log lines.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Success => "SUCCESS",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives plain-text diagnostic lines.
///
/// Shared by concurrent sessions, so implementations must serialize their writes.
pub trait Logger: Send + Sync {
    /// Records one line at `level`.
    fn log(&self, level: Level, message: &str);

    /// Records progress.
    fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    /// Records a successful send.
    fn success(&self, message: &str) {
        self.log(Level::Success, message);
    }

    /// Records an anomaly.
    fn warning(&self, message: &str) {
        self.log(Level::Warning, message);
    }

    /// Records a failure.
    fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }
}

impl<L: Logger + ?Sized> Logger for Arc<L> {
    fn log(&self, level: Level, message: &str) {
        (**self).log(level, message);
    }
}

impl<L: Logger + ?Sized> Logger for &L {
    fn log(&self, level: Level, message: &str) {
        (**self).log(level, message);
    }
}

/// Forwards diagnostics to `tracing` under the `mailpost` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::Info => tracing::info!(target: "mailpost", "{message}"),
            Level::Success => tracing::info!(target: "mailpost", outcome = "success", "{message}"),
            Level::Warning => tracing::warn!(target: "mailpost", "{message}"),
            Level::Error => tracing::error!(target: "mailpost", "{message}"),
        }
    }
}
