//! Diagnostics sink for pipeline observability.
//!
//! The driver and operations report anomalies through the `Diagnostics`
//! trait instead of a process-wide logger. `TracingDiagnostics` forwards to
//! `tracing`; `CapturedDiagnostics` keeps messages in memory for tests.

use std::cell::RefCell;

/// Severity of a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Warning,
    Error,
}

/// Receiver for human-readable diagnostic messages.
pub trait Diagnostics {
    fn emit(&self, level: Level, message: &str);

    fn debug(&self, message: &str) {
        self.emit(Level::Debug, message);
    }

    fn warning(&self, message: &str) {
        self.emit(Level::Warning, message);
    }

    fn error(&self, message: &str) {
        self.emit(Level::Error, message);
    }
}

impl<D: Diagnostics + ?Sized> Diagnostics for &D {
    fn emit(&self, level: Level, message: &str) {
        (**self).emit(level, message);
    }
}

/// Forwards diagnostics to `tracing` under the `record_chains` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn emit(&self, level: Level, message: &str) {
        match level {
            Level::Debug => tracing::debug!(target: "record_chains", "{message}"),
            Level::Warning => tracing::warn!(target: "record_chains", "{message}"),
            Level::Error => tracing::error!(target: "record_chains", "{message}"),
        }
    }
}

/// Discards every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentDiagnostics;

impl Diagnostics for SilentDiagnostics {
    fn emit(&self, _level: Level, _message: &str) {}
}

/// One captured diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
}

/// Collects diagnostics in emission order.
#[derive(Debug, Default)]
pub struct CapturedDiagnostics {
    entries: RefCell<Vec<Diagnostic>>,
}

impl CapturedDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries.borrow().clone()
    }

    /// Messages emitted at exactly `level`.
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .filter(|d| d.level == level)
            .map(|d| d.message.clone())
            .collect()
    }

    pub fn count(&self, level: Level) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|d| d.level == level)
            .count()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl Diagnostics for CapturedDiagnostics {
    fn emit(&self, level: Level, message: &str) {
        self.entries.borrow_mut().push(Diagnostic {
            level,
            message: message.to_string(),
        });
    }
}
