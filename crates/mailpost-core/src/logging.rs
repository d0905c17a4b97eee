//! Log sinks for the transaction's diagnostics.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{Local, NaiveDate, NaiveDateTime};
use mailpost_smtp::{Level, Logger};

/// Appends diagnostics to one file per day, `smtp_YYYY-MM-DD.log`.
///
/// The directory is created on first write. Appends are serialized, so
/// concurrent sends never interleave partial lines. A failed write is reported
/// through `tracing` and otherwise ignored.
#[derive(Debug)]
pub struct FileLogger {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl FileLogger {
    /// Creates a logger writing under `dir`. Nothing is touched until the first line.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    /// Returns the file today's lines go to.
    #[must_use]
    pub fn current_file(&self) -> PathBuf {
        self.file_for(Local::now().date_naive())
    }

    /// Returns the file for a given day.
    #[must_use]
    pub fn file_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("smtp_{}.log", date.format("%Y-%m-%d")))
    }

    fn append(&self, at: NaiveDateTime, level: Level, message: &str) -> io::Result<()> {
        let line = format_line(at, level, message);
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        fs::create_dir_all(&self.dir)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.file_for(at.date()))?;
        file.write_all(line.as_bytes())
    }
}

impl Logger for FileLogger {
    fn log(&self, level: Level, message: &str) {
        if let Err(e) = self.append(Local::now().naive_local(), level, message) {
            tracing::warn!(dir = %self.dir.display(), "failed to write log file: {e}");
        }
    }
}

/// Formats `[YYYY-MM-DD HH:MM:SS] [LEVEL] message` with a trailing newline.
/// Embedded line breaks are flattened so one call is one line.
fn format_line(at: NaiveDateTime, level: Level, message: &str) -> String {
    let message = message.replace(['\r', '\n'], " ");
    format!("[{}] [{level}] {message}\n", at.format("%Y-%m-%d %H:%M:%S"))
}

/// Forwards every line to each inner logger in order.
#[derive(Clone, Default)]
pub struct MultiLogger {
    sinks: Vec<Arc<dyn Logger>>,
}

impl MultiLogger {
    /// Creates an empty fan-out.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sink.
    #[must_use]
    pub fn with(mut self, sink: Arc<dyn Logger>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl Logger for MultiLogger {
    fn log(&self, level: Level, message: &str) {
        for sink in &self.sinks {
            sink.log(level, message);
        }
    }
}

impl std::fmt::Debug for MultiLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiLogger")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}
