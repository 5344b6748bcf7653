//! Structured event log and progress stream.
//!
//! [`EventLog`] is the append-only record of one run. Every entry is also
//! mirrored to `tracing` and, when a sender is attached, broadcast to live
//! observers such as the CLI progress renderer.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

/// Default capacity of the observer channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    /// Informational.
    Info,
    /// A step completed.
    Success,
    /// A step failed.
    Error,
}

/// One immutable log entry.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    /// Unique entry ID.
    pub id: Uuid,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Human readable message.
    pub message: String,
    /// Severity.
    pub kind: LogKind,
}

/// Progress of the current mapping's record loop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    /// Last successfully migrated record position (1-based).
    pub current: usize,
    /// Records fetched for this mapping.
    pub total: usize,
    /// Source table being migrated.
    pub collection: String,
}

impl Progress {
    /// Completion percentage, rounded.
    #[must_use]
    pub fn percentage(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.current as f64 / self.total as f64) * 100.0).round() as u8
    }
}

/// Overall state of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Not running, or canceled.
    #[default]
    Idle,
    /// A run is in progress.
    Migrating,
    /// The run went through every mapping.
    Completed,
    /// The run was rejected or aborted.
    Error,
}

/// Event delivered to live observers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "lowercase")]
pub enum MigrationEvent {
    /// A new log entry.
    Log(LogEntry),
    /// Progress changed.
    Progress(Progress),
    /// Run status changed.
    Status(RunStatus),
}

/// Append-only event log for one run.
#[derive(Debug, Default)]
pub struct EventLog {
    entries: Vec<LogEntry>,
    sender: Option<broadcast::Sender<MigrationEvent>>,
}

impl EventLog {
    /// Creates a log with no observers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a log that broadcasts to `sender`'s subscribers.
    #[must_use]
    pub fn with_sender(sender: broadcast::Sender<MigrationEvent>) -> Self {
        Self {
            entries: Vec::new(),
            sender: Some(sender),
        }
    }

    /// Appends an informational entry.
    pub fn info(&mut self, message: impl Into<String>) {
        self.push(LogKind::Info, message.into());
    }

    /// Appends a success entry.
    pub fn success(&mut self, message: impl Into<String>) {
        self.push(LogKind::Success, message.into());
    }

    /// Appends an error entry.
    pub fn error(&mut self, message: impl Into<String>) {
        self.push(LogKind::Error, message.into());
    }

    fn push(&mut self, kind: LogKind, message: String) {
        match kind {
            LogKind::Info | LogKind::Success => info!("{}", message),
            LogKind::Error => warn!("{}", message),
        }

        let entry = LogEntry {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            message,
            kind,
        };
        self.emit(MigrationEvent::Log(entry.clone()));
        self.entries.push(entry);
    }

    /// Broadcasts an event without recording it.
    pub fn emit(&self, event: MigrationEvent) {
        if let Some(sender) = &self.sender {
            // No active receivers is fine
            let _ = sender.send(event);
        }
    }

    /// All entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Number of entries of the given kind.
    #[must_use]
    pub fn count(&self, kind: LogKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }

    /// Consumes the log, returning its entries.
    #[must_use]
    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }
}
