// crates/modvet-core/src/audit.rs
// ============================================================================
// Module: Audit Logging
// Description: Structured JSON-lines events for store, dispatch, and server.
// Purpose: Emit machine-readable operational logs without a logging backend.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every component reports what it did through an [`AuditSink`]. Events are
//! flat JSON objects with a fixed set of optional fields so downstream tooling
//! can filter on `event` and `level` alone. Sinks drop events below their
//! configured minimum [`LogLevel`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Log Level
// ============================================================================

/// Severity of an audit event, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Per-request detail.
    Debug,
    /// Normal lifecycle events.
    #[default]
    Info,
    /// Recoverable failures.
    Warn,
    /// Failures that need operator attention.
    Error,
}

impl LogLevel {
    /// Returns the lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

// ============================================================================
// SECTION: Event
// ============================================================================

/// Audit event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event severity.
    pub level: LogLevel,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Package key the event concerns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    /// Filesystem path the event concerns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Item count (records loaded, purged, and so on).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    /// Short machine-readable reason label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// External command argument vector.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    /// External command exit code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Error description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Free-form message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AuditEvent {
    /// Creates an event with a consistent timestamp and no optional fields.
    #[must_use]
    pub fn new(event: &'static str, level: LogLevel) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event,
            level,
            timestamp_ms,
            package: None,
            path: None,
            count: None,
            reason: None,
            args: None,
            exit_code: None,
            error: None,
            message: None,
        }
    }

    /// Sets the package key.
    #[must_use]
    pub fn package(mut self, package: impl fmt::Display) -> Self {
        self.package = Some(package.to_string());
        self
    }

    /// Sets the filesystem path.
    #[must_use]
    pub fn path(mut self, path: &Path) -> Self {
        self.path = Some(path.display().to_string());
        self
    }

    /// Sets the item count.
    #[must_use]
    pub const fn count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    /// Sets the reason label.
    #[must_use]
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Sets the command argument vector.
    #[must_use]
    pub fn args(mut self, args: &[String]) -> Self {
        self.args = Some(args.to_vec());
        self
    }

    /// Sets the command exit code.
    #[must_use]
    pub const fn exit_code(mut self, exit_code: Option<i32>) -> Self {
        self.exit_code = exit_code;
        self
    }

    /// Sets the error description.
    #[must_use]
    pub fn error(mut self, error: impl fmt::Display) -> Self {
        self.error = Some(error.to_string());
        self
    }

    /// Sets the free-form message.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Destination for audit events.
pub trait AuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &AuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink {
    /// Events below this level are dropped.
    min_level: LogLevel,
}

impl StderrAuditSink {
    /// Creates a stderr sink with the given minimum level.
    #[must_use]
    pub const fn new(min_level: LogLevel) -> Self {
        Self {
            min_level,
        }
    }
}

impl AuditSink for StderrAuditSink {
    fn record(&self, event: &AuditEvent) {
        if event.level < self.min_level {
            return;
        }
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
    /// Events below this level are dropped.
    min_level: LogLevel,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path, min_level: LogLevel) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
            min_level,
        })
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, event: &AuditEvent) {
        if event.level < self.min_level {
            return;
        }
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// Audit sink that keeps events in memory, for embedding and tests.
#[derive(Default)]
pub struct MemoryAuditSink {
    /// Recorded events in arrival order.
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    /// Creates an empty in-memory sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every recorded event.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Returns the recorded events with the given identifier.
    #[must_use]
    pub fn named(&self, event: &str) -> Vec<AuditEvent> {
        self.events().into_iter().filter(|recorded| recorded.event == event).collect()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &AuditEvent) {}
}

// ============================================================================
// SECTION: Tests
// ============================================================================
