//! Injected logging capability
//!
//! Components never reach for a global logger. The caller hands in a
//! [`LogSink`] and every stage writes diagnostics through it, wrapped in a
//! [`Logger`] that applies the run's verbosity.

use std::sync::Mutex;

/// Severity of a diagnostic message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
}

/// Minimal destination for diagnostics
pub trait LogSink {
    fn log(&self, level: Level, message: &str);
}

/// Forwards diagnostics to `tracing` under the `crosslink` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::Debug => tracing::debug!(target: "crosslink", "{message}"),
            Level::Info => tracing::info!(target: "crosslink", "{message}"),
            Level::Warn => tracing::warn!(target: "crosslink", "{message}"),
        }
    }
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl LogSink for NullSink {
    fn log(&self, _level: Level, _message: &str) {}
}

/// Records every entry in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<(Level, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded entries, oldest first
    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Recorded messages at exactly `level`
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }
}

impl LogSink for MemorySink {
    fn log(&self, level: Level, message: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((level, message.to_string()));
        }
    }
}

/// A sink paired with the run's verbosity
///
/// `debug` messages are dropped unless the run is verbose.
#[derive(Clone, Copy)]
pub struct Logger<'a> {
    sink: &'a dyn LogSink,
    verbose: bool,
}

impl<'a> Logger<'a> {
    pub fn new(sink: &'a dyn LogSink, verbose: bool) -> Self {
        Self { sink, verbose }
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        if self.verbose {
            self.sink.log(Level::Debug, message.as_ref());
        }
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.sink.log(Level::Info, message.as_ref());
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.sink.log(Level::Warn, message.as_ref());
    }
}
