//! Observable events for stratakv
//!
//! Events are explicit and typed.

use std::fmt;

use super::Severity;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Database lifecycle
    /// Configuration loaded
    ConfigLoaded,
    /// Database opened, catalog and history loaded
    DatabaseOpened,
    /// Database closed
    DatabaseClosed,
    /// Table added to the catalog
    TableCreated,

    // Checkpoint
    /// Checkpoint started
    CheckpointBegin,
    /// One table's update chains written out
    TableReconciled,
    /// Checkpoint complete
    CheckpointComplete,
    /// Checkpoint failed
    CheckpointFailed,

    // Version cursor
    /// Version cursor opened
    CursorOpened,
    /// Version cursor closed
    CursorClosed,
    /// Traversal ran through every layer
    CursorExhausted,
    /// Cursor reset because an operation failed
    CursorResetAfterError,

    /// Checksum or framing failure in a data file (FATAL)
    DataCorruption,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::DatabaseOpened => "DATABASE_OPENED",
            Event::DatabaseClosed => "DATABASE_CLOSED",
            Event::TableCreated => "TABLE_CREATED",

            Event::CheckpointBegin => "CHECKPOINT_BEGIN",
            Event::TableReconciled => "TABLE_RECONCILED",
            Event::CheckpointComplete => "CHECKPOINT_COMPLETE",
            Event::CheckpointFailed => "CHECKPOINT_FAILED",

            Event::CursorOpened => "CURSOR_OPENED",
            Event::CursorClosed => "CURSOR_CLOSED",
            Event::CursorExhausted => "CURSOR_EXHAUSTED",
            Event::CursorResetAfterError => "CURSOR_RESET_AFTER_ERROR",

            Event::DataCorruption => "DATA_CORRUPTION",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::CursorOpened | Event::CursorClosed | Event::CursorExhausted => {
                Severity::Trace
            }
            Event::CursorResetAfterError => Severity::Warn,
            Event::CheckpointFailed => Severity::Error,
            Event::DataCorruption => Severity::Fatal,
            _ => Severity::Info,
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
