//! Logging utilities and structured logging support
//!
//! Engine code logs through the `log` facade only. The [`DebugLogger`] turns
//! every record into a structured [`LogEntry`], prints it through an
//! `env_logger` console logger and appends warnings and errors to a
//! persistent, append-only [`LogStore`].
//!
//! The logger is an explicitly constructed service: build it, optionally
//! inspect or share its store, then [`DebugLogger::install`] it once at
//! startup. Nothing in the engine depends on log delivery succeeding.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub use log::{debug, error, info, trace, warn};

use crate::config::LoggingConfig;

/// Severity of a structured log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Informational message (also covers debug and trace records)
    Info,
    /// Something degraded but the engine continues normally
    Warning,
    /// An operation failed and was skipped
    Error,
}

impl From<log::Level> for Severity {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warning,
            log::Level::Info | log::Level::Debug | log::Level::Trace => Self::Info,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        };
        f.write_str(label)
    }
}

/// One structured log record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Short title, taken from the record target (e.g. `ember_engine::render::gpu`)
    pub title: String,
    /// Formatted message
    pub description: String,
    /// Source file of the call site
    pub file: String,
    /// Enclosing module path of the call site
    pub function: String,
    /// Source line of the call site
    pub line: u32,
    /// Entry severity
    pub severity: Severity,
}

impl LogEntry {
    /// Build an entry from a `log` record
    pub fn from_record(record: &log::Record<'_>) -> Self {
        Self {
            title: record.target().to_string(),
            description: record.args().to_string(),
            file: record.file().unwrap_or("<unknown>").to_string(),
            function: record.module_path().unwrap_or("<unknown>").to_string(),
            line: record.line().unwrap_or(0),
            severity: record.level().into(),
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} ({}:{} in {})",
            self.severity, self.title, self.description, self.file, self.line, self.function
        )
    }
}

/// Append-only sink for warning and error entries
pub trait LogStore: Send + Sync {
    /// Append one entry to the store
    fn append(&self, entry: &LogEntry) -> std::io::Result<()>;
}

impl<T: LogStore + ?Sized> LogStore for Arc<T> {
    fn append(&self, entry: &LogEntry) -> std::io::Result<()> {
        (**self).append(entry)
    }
}

/// Log store backed by a text file opened in append mode
pub struct FileLogStore {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl FileLogStore {
    /// Create a store writing to `path`; the file is opened on first append
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogStore for FileLogStore {
    fn append(&self, entry: &LogEntry) -> std::io::Result<()> {
        let mut guard = self
            .file
            .lock()
            .map_err(|_| std::io::Error::other("log store mutex poisoned"))?;
        if guard.is_none() {
            *guard = Some(OpenOptions::new().create(true).append(true).open(&self.path)?);
        }
        match guard.as_mut() {
            Some(file) => writeln!(file, "{entry}"),
            None => Ok(()),
        }
    }
}

/// In-memory log store, mostly useful in tests
#[derive(Default)]
pub struct MemoryLogStore {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLogStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every appended entry
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl LogStore for MemoryLogStore {
    fn append(&self, entry: &LogEntry) -> std::io::Result<()> {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry.clone());
        }
        Ok(())
    }
}

/// Structured logger: console output through `env_logger` plus a persistent store
pub struct DebugLogger {
    console: env_logger::Logger,
    store: Option<Box<dyn LogStore>>,
}

impl DebugLogger {
    /// Create a logger with the given `env_logger` filter (e.g. `"info"`)
    ///
    /// Falls back to `RUST_LOG`, then to `info`, when `filter` is `None`.
    pub fn new(filter: Option<&str>) -> Self {
        let mut builder = env_logger::Builder::new();
        match filter {
            Some(filter) => {
                builder.parse_filters(filter);
            }
            None => match std::env::var("RUST_LOG") {
                Ok(filter) => {
                    builder.parse_filters(&filter);
                }
                Err(_) => {
                    builder.filter_level(log::LevelFilter::Info);
                }
            },
        }
        Self {
            console: builder.build(),
            store: None,
        }
    }

    /// Attach the store receiving warning and error entries
    pub fn with_store(mut self, store: impl LogStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    /// Build a logger from the engine logging configuration
    pub fn from_config(config: &LoggingConfig) -> Self {
        let logger = Self::new(config.filter.as_deref());
        match &config.log_file {
            Some(path) => logger.with_store(FileLogStore::new(path)),
            None => logger,
        }
    }

    /// Register this logger as the process logger
    ///
    /// Fails if a logger was already installed.
    pub fn install(self) -> Result<(), log::SetLoggerError> {
        let max_level = self.console.filter().max(log::LevelFilter::Warn);
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(max_level);
        Ok(())
    }
}

impl log::Log for DebugLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        self.console.enabled(metadata) || metadata.level() <= log::Level::Warn
    }

    fn log(&self, record: &log::Record<'_>) {
        if self.console.matches(record) {
            self.console.log(record);
        }
        if record.level() <= log::Level::Warn {
            if let Some(store) = &self.store {
                // Delivery failures are dropped on purpose
                let _ = store.append(&LogEntry::from_record(record));
            }
        }
    }

    fn flush(&self) {
        self.console.flush();
    }
}

/// Initialize the logging system from configuration
///
/// Subsequent calls are ignored.
pub fn init(config: &LoggingConfig) {
    if DebugLogger::from_config(config).install().is_ok() {
        log::debug!("logging initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Log;

    fn record_at(level: log::Level, message: std::fmt::Arguments<'_>, f: impl FnOnce(&log::Record<'_>)) {
        f(&log::Record::builder()
            .level(level)
            .target("ember_engine::render::gpu")
            .file(Some("gpu.rs"))
            .line(Some(42))
            .module_path(Some("ember_engine::render::gpu"))
            .args(message)
            .build());
    }

    #[test]
    fn test_entry_from_record() {
        record_at(log::Level::Error, format_args!("buffer allocation failed"), |record| {
            let entry = LogEntry::from_record(record);
            assert_eq!(entry.severity, Severity::Error);
            assert_eq!(entry.title, "ember_engine::render::gpu");
            assert_eq!(entry.description, "buffer allocation failed");
            assert_eq!(entry.file, "gpu.rs");
            assert_eq!(entry.line, 42);
            assert!(entry.to_string().starts_with("[ERROR]"));
        });
    }

    #[test]
    fn test_only_warnings_and_errors_reach_store() {
        let store = Arc::new(MemoryLogStore::new());
        let logger = DebugLogger::new(Some("off")).with_store(Arc::clone(&store));

        record_at(log::Level::Info, format_args!("info"), |r| logger.log(r));
        record_at(log::Level::Warn, format_args!("warn"), |r| logger.log(r));
        record_at(log::Level::Error, format_args!("error"), |r| logger.log(r));

        let entries = store.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].severity, Severity::Warning);
        assert_eq!(entries[1].severity, Severity::Error);
    }

    #[test]
    fn test_file_store_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.log");
        let logger = DebugLogger::new(Some("off")).with_store(FileLogStore::new(&path));

        record_at(log::Level::Warn, format_args!("first"), |r| logger.log(r));
        record_at(log::Level::Error, format_args!("second"), |r| logger.log(r));

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("first"));
        assert!(lines[1].contains("second"));
    }
}
