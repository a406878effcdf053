//! Metrics registry for stratakv
//!
//! - Counters only (no gauges, no histograms)
//! - Monotonic increase
//! - Reset only on process start
//! - Thread-safe but lock-minimal

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::mvcc::VersionKind;

/// Metrics registry containing all operational counters
///
/// # Thread Safety
///
/// All counters use atomic operations for thread-safe increments.
/// Uses Relaxed ordering for minimal overhead.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Version cursors opened
    cursors_opened: AtomicU64,
    /// Version cursors closed
    cursors_closed: AtomicU64,
    /// Versions emitted from update chains (updates and tombstones)
    chain_versions: AtomicU64,
    /// Versions emitted from on-disk rows
    on_disk_versions: AtomicU64,
    /// Versions emitted from the history store
    history_versions: AtomicU64,
    /// Traversals that ran through every layer
    traversals_exhausted: AtomicU64,
    /// Cursor resets forced by an error
    error_resets: AtomicU64,
    /// Chain handles that outlived their node
    stale_chain_errors: AtomicU64,
    /// Calls to operations a cursor does not provide
    unsupported_calls: AtomicU64,
    /// Table reconciliations that wrote anything
    reconciliations: AtomicU64,
    /// Records appended to the history store
    history_records_written: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    // Cursor lifecycle

    pub fn increment_cursors_opened(&self) {
        self.cursors_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_cursors_closed(&self) {
        self.cursors_closed.fetch_add(1, Ordering::Relaxed);
    }

    // Traversal

    /// Count one emitted version against the layer it came from.
    pub fn record_version(&self, kind: VersionKind) {
        let counter = match kind {
            VersionKind::Update | VersionKind::Tombstone => &self.chain_versions,
            VersionKind::OnDisk => &self.on_disk_versions,
            VersionKind::History => &self.history_versions,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_traversals_exhausted(&self) {
        self.traversals_exhausted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_error_resets(&self) {
        self.error_resets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_stale_chain_errors(&self) {
        self.stale_chain_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_unsupported_calls(&self) {
        self.unsupported_calls.fetch_add(1, Ordering::Relaxed);
    }

    // Reconciliation

    /// Record one reconciliation that moved `history_records` values to
    /// the history store.
    pub fn record_reconciliation(&self, history_records: u64) {
        self.reconciliations.fetch_add(1, Ordering::Relaxed);
        self.history_records_written
            .fetch_add(history_records, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cursors_opened: self.cursors_opened.load(Ordering::Relaxed),
            cursors_closed: self.cursors_closed.load(Ordering::Relaxed),
            chain_versions: self.chain_versions.load(Ordering::Relaxed),
            on_disk_versions: self.on_disk_versions.load(Ordering::Relaxed),
            history_versions: self.history_versions.load(Ordering::Relaxed),
            traversals_exhausted: self.traversals_exhausted.load(Ordering::Relaxed),
            error_resets: self.error_resets.load(Ordering::Relaxed),
            stale_chain_errors: self.stale_chain_errors.load(Ordering::Relaxed),
            unsupported_calls: self.unsupported_calls.load(Ordering::Relaxed),
            reconciliations: self.reconciliations.load(Ordering::Relaxed),
            history_records_written: self.history_records_written.load(Ordering::Relaxed),
        }
    }

    /// Current values as one JSON object
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MetricsSnapshot {
    pub cursors_opened: u64,
    pub cursors_closed: u64,
    pub chain_versions: u64,
    pub on_disk_versions: u64,
    pub history_versions: u64,
    pub traversals_exhausted: u64,
    pub error_resets: u64,
    pub stale_chain_errors: u64,
    pub unsupported_calls: u64,
    pub reconciliations: u64,
    pub history_records_written: u64,
}

impl MetricsSnapshot {
    /// Versions emitted across all layers.
    pub fn versions_emitted(&self) -> u64 {
        self.chain_versions + self.on_disk_versions + self.history_versions
    }
}
