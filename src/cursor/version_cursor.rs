//! Version cursor
//!
//! Walks every version of one key, newest first, across three layers:
//!
//! 1. the in-memory update chain, through the base cursor;
//! 2. the on-disk row, through the base cursor;
//! 3. the history store, through the history source.
//!
//! Each `next` emits exactly one version. Stop markers of chain and on-disk
//! versions are the start marker of the previously emitted (newer) version;
//! history versions carry the stop marker recorded at reconciliation.

use std::sync::Arc;

use uuid::Uuid;

use crate::mvcc::{CommitId, Timestamp, VersionKind, VersionMetadata, KEY_FORMAT};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::storage::StoredVersion;
use crate::table::{ChainEntry, SlotProbe};

use super::{BaseCursor, Cursor, CursorError, CursorResult, HistorySource, Phase, PhaseFlags};
use super::{VersionKey, VersionRecord};

#[derive(Debug)]
struct Traversal {
    key: Vec<u8>,
    phase: Phase,
    history_positioned: bool,
    /// Start marker of the last emitted version, once one was emitted
    newer_start: Option<Option<Timestamp>>,
    /// Order of the last emitted version
    last_order: Option<(CommitId, u64)>,
}

impl Traversal {
    fn new(key: &[u8], phase: Phase) -> Self {
        Self {
            key: key.to_vec(),
            phase,
            history_positioned: false,
            newer_start: None,
            last_order: None,
        }
    }

    fn stop_marker(&self) -> Option<Timestamp> {
        self.newer_start.map(|start| start.unwrap_or(0))
    }

    fn is_older(&self, record: &StoredVersion) -> bool {
        self.last_order
            .map_or(true, |last| (record.commit_id, record.revision) < last)
    }

    fn emit(&mut self, metadata: VersionMetadata, value: Vec<u8>) -> VersionRecord {
        self.newer_start = Some(metadata.start_ts);
        self.last_order = Some((metadata.commit_id, metadata.revision));
        VersionRecord {
            user_key: self.key.clone(),
            metadata,
            value,
        }
    }

    fn emit_chain(&mut self, entry: ChainEntry) -> VersionRecord {
        let kind = if entry.payload.is_tombstone() {
            VersionKind::Tombstone
        } else {
            VersionKind::Update
        };
        let metadata = VersionMetadata {
            start_ts: entry.start_ts,
            stop_ts: self.stop_marker(),
            commit_id: entry.commit_id,
            revision: entry.revision,
            durable_ts: entry.durable_ts,
            kind,
        };
        self.emit(metadata, entry.payload.bytes().to_vec())
    }

    fn emit_on_disk(&mut self, row: StoredVersion) -> VersionRecord {
        let mut metadata = row.metadata(VersionKind::OnDisk);
        metadata.stop_ts = self.stop_marker();
        self.emit(metadata, row.value)
    }

    fn emit_history(&mut self, record: StoredVersion) -> VersionRecord {
        let metadata = record.metadata(VersionKind::History);
        self.emit(metadata, record.value)
    }
}

/// Read-only cursor over every version of a key.
///
/// Owns its base cursor and history source. Both are released by
/// [`Cursor::close`] or, failing that, on drop.
pub struct VersionCursor<B: BaseCursor, H: HistorySource> {
    id: Uuid,
    uri: String,
    value_format: String,
    base: Option<B>,
    history: Option<H>,
    traversal: Option<Traversal>,
    current: Option<VersionRecord>,
    metrics: Arc<MetricsRegistry>,
}

impl<B: BaseCursor, H: HistorySource> VersionCursor<B, H> {
    pub fn new(base: B, history: H, metrics: Arc<MetricsRegistry>) -> Self {
        let id = Uuid::new_v4();
        let uri = base.uri().to_string();
        let value_format = base.value_format().to_string();

        metrics.increment_cursors_opened();
        let cursor_id = id.to_string();
        log_event_with_fields(
            Event::CursorOpened,
            &[("cursor_id", cursor_id.as_str()), ("uri", uri.as_str())],
        );

        Self {
            id,
            uri,
            value_format,
            base: Some(base),
            history: Some(history),
            traversal: None,
            current: None,
            metrics,
        }
    }

    /// Identifier used in log lines.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current phase, if positioned.
    pub fn phase(&self) -> Option<Phase> {
        self.traversal.as_ref().map(|t| t.phase)
    }

    /// Exhaustion flags of the current traversal; all clear when not
    /// positioned.
    pub fn flags(&self) -> PhaseFlags {
        self.phase().map(|p| p.flags()).unwrap_or_default()
    }

    pub fn is_positioned(&self) -> bool {
        self.traversal.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.base.is_none() && self.history.is_none()
    }

    /// The version most recently emitted.
    pub fn current(&self) -> Option<&VersionRecord> {
        self.current.as_ref()
    }

    /// Advances one version and returns it; `Ok(None)` once exhausted.
    pub fn next_version(&mut self) -> CursorResult<Option<VersionRecord>> {
        match Cursor::next(self) {
            Ok(()) => Ok(self.current.clone()),
            Err(CursorError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn base_mut(base: &mut Option<B>) -> CursorResult<&mut B> {
        base.as_mut().ok_or(CursorError::InvalidState("cursor closed"))
    }

    fn step(&mut self) -> CursorResult<VersionRecord> {
        let traversal = self
            .traversal
            .as_mut()
            .ok_or(CursorError::InvalidState("cursor not positioned"))?;

        loop {
            match traversal.phase {
                Phase::Chain(handle) => {
                    let entry = Self::base_mut(&mut self.base)?.chain_entry(handle)?;
                    traversal.phase.advance(match entry.older {
                        Some(older) => Phase::Chain(older),
                        None => Phase::OnDisk,
                    });
                    return Ok(traversal.emit_chain(entry));
                }
                Phase::OnDisk => {
                    let row = Self::base_mut(&mut self.base)?.on_disk()?;
                    traversal.phase.advance(Phase::History);
                    if let Some(row) = row {
                        return Ok(traversal.emit_on_disk(row));
                    }
                }
                Phase::History => {
                    let history = self
                        .history
                        .as_mut()
                        .ok_or(CursorError::InvalidState("cursor closed"))?;
                    if !traversal.history_positioned {
                        history.search(&self.uri, &traversal.key)?;
                        traversal.history_positioned = true;
                    }

                    while let Some(record) = history.next()? {
                        if traversal.is_older(&record) {
                            return Ok(traversal.emit_history(record));
                        }
                    }

                    traversal.phase.advance(Phase::Exhausted);
                    self.metrics.increment_traversals_exhausted();
                    let cursor_id = self.id.to_string();
                    log_event_with_fields(
                        Event::CursorExhausted,
                        &[("cursor_id", cursor_id.as_str()), ("uri", self.uri.as_str())],
                    );
                    return Err(CursorError::NotFound);
                }
                Phase::Exhausted => return Err(CursorError::NotFound),
            }
        }
    }

    /// Drops the history position and positions the base cursor on `key`.
    fn probe(&mut self, key: &[u8]) -> CursorResult<Option<SlotProbe>> {
        if let Some(history) = self.history.as_mut() {
            history.reset()?;
        }
        let base = Self::base_mut(&mut self.base)?;
        base.set_key(key);
        base.search_key_only()
    }

    /// Resets after `err` and hands it back for propagation.
    fn fail(&mut self, err: CursorError) -> CursorError {
        if matches!(err, CursorError::StaleChain) {
            self.metrics.increment_stale_chain_errors();
        }
        self.metrics.increment_error_resets();
        let cursor_id = self.id.to_string();
        log_event_with_fields(
            Event::CursorResetAfterError,
            &[
                ("code", err.code()),
                ("cursor_id", cursor_id.as_str()),
                ("uri", self.uri.as_str()),
            ],
        );
        let _ = Cursor::reset(self);
        err
    }
}

/// Keeps the first error; later ones are dropped.
fn first_error(slot: &mut Option<CursorError>, result: CursorResult<()>) {
    if let Err(err) = result {
        slot.get_or_insert(err);
    }
}

impl<B: BaseCursor, H: HistorySource> Cursor for VersionCursor<B, H> {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn key_format(&self) -> &str {
        KEY_FORMAT
    }

    fn value_format(&self) -> &str {
        &self.value_format
    }

    fn set_key(&mut self, key: &[u8]) -> CursorResult<()> {
        Self::base_mut(&mut self.base)?.set_key(key);
        Ok(())
    }

    fn search(&mut self, key: &[u8]) -> CursorResult<()> {
        self.traversal = None;
        self.current = None;

        match self.probe(key) {
            Ok(Some(probe)) => {
                let phase = probe.chain_head.map_or(Phase::OnDisk, Phase::Chain);
                self.traversal = Some(Traversal::new(key, phase));
                Ok(())
            }
            Ok(None) => {
                // A failed reset never masks the miss.
                let _ = self.reset();
                Err(CursorError::NotFound)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn next(&mut self) -> CursorResult<()> {
        match self.step() {
            Ok(record) => {
                self.metrics.record_version(record.metadata.kind);
                self.current = Some(record);
                Ok(())
            }
            Err(CursorError::NotFound) => {
                self.current = None;
                Err(CursorError::NotFound)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn get_key(&mut self) -> CursorResult<VersionKey> {
        match self.current.as_ref() {
            Some(record) => Ok(record.key()),
            None => Err(self.fail(CursorError::InvalidState("no version emitted"))),
        }
    }

    fn get_value(&mut self) -> CursorResult<Vec<u8>> {
        match self.current.as_ref() {
            Some(record) => Ok(record.value.clone()),
            None => Err(self.fail(CursorError::InvalidState("no version emitted"))),
        }
    }

    fn reset(&mut self) -> CursorResult<()> {
        self.traversal = None;
        self.current = None;

        let mut first = None;
        if let Some(base) = self.base.as_mut() {
            first_error(&mut first, base.reset());
        }
        if let Some(history) = self.history.as_mut() {
            first_error(&mut first, history.reset());
        }
        first.map_or(Ok(()), Err)
    }

    fn close(&mut self) -> CursorResult<()> {
        self.traversal = None;
        self.current = None;

        let base = self.base.take();
        let history = self.history.take();
        if base.is_none() && history.is_none() {
            return Ok(());
        }

        let mut first = None;
        if let Some(mut base) = base {
            first_error(&mut first, base.close());
        }
        if let Some(mut history) = history {
            first_error(&mut first, history.close());
        }

        self.metrics.increment_cursors_closed();
        let cursor_id = self.id.to_string();
        log_event_with_fields(
            Event::CursorClosed,
            &[("cursor_id", cursor_id.as_str()), ("uri", self.uri.as_str())],
        );
        first.map_or(Ok(()), Err)
    }

    fn on_unsupported(&mut self, _op: &'static str) {
        self.metrics.increment_unsupported_calls();
    }
}

impl<B: BaseCursor, H: HistorySource> Drop for VersionCursor<B, H> {
    fn drop(&mut self) {
        let _ = Cursor::close(self);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::mvcc::VersionPayload;
    use crate::storage::StorageError;
    use crate::table::ChainHandle;

    /// Records which sub-cursor calls were made and can fail any of them.
    #[derive(Default)]
    struct Calls {
        base_resets: usize,
        base_closes: usize,
        history_resets: usize,
        history_closes: usize,
        history_searches: usize,
    }

    #[derive(Default)]
    struct Faults {
        base_reset: bool,
        history_reset: bool,
        base_close: bool,
        history_close: bool,
        on_disk: bool,
        history_next: bool,
    }

    type Shared<T> = Rc<RefCell<T>>;

    struct MockBase {
        chain: Vec<ChainEntry>,
        on_disk: Option<StoredVersion>,
        has_slot: bool,
        positioned: bool,
        calls: Shared<Calls>,
        faults: Shared<Faults>,
    }

    /// The mock resolves handles by index alone.
    fn handle(index: usize) -> ChainHandle {
        ChainHandle::new(index, 0)
    }

    impl BaseCursor for MockBase {
        fn uri(&self) -> &str {
            "table:mock"
        }

        fn value_format(&self) -> &str {
            "u"
        }

        fn set_key(&mut self, _key: &[u8]) {}

        fn search_key_only(&mut self) -> CursorResult<Option<SlotProbe>> {
            if !self.has_slot {
                return Ok(None);
            }
            self.positioned = true;
            Ok(Some(SlotProbe {
                chain_head: (!self.chain.is_empty()).then(|| handle(0)),
            }))
        }

        fn chain_entry(&mut self, handle: ChainHandle) -> CursorResult<ChainEntry> {
            self.chain
                .get(handle.index())
                .cloned()
                .ok_or(CursorError::StaleChain)
        }

        fn on_disk(&mut self) -> CursorResult<Option<StoredVersion>> {
            if self.faults.borrow().on_disk {
                return Err(StorageError::data_corruption("bad row").into());
            }
            Ok(self.on_disk.clone())
        }

        fn reset(&mut self) -> CursorResult<()> {
            self.positioned = false;
            self.calls.borrow_mut().base_resets += 1;
            if self.faults.borrow().base_reset {
                return Err(CursorError::InvalidState("base reset failed"));
            }
            Ok(())
        }

        fn close(&mut self) -> CursorResult<()> {
            self.calls.borrow_mut().base_closes += 1;
            if self.faults.borrow().base_close {
                return Err(CursorError::InvalidState("base close failed"));
            }
            Ok(())
        }
    }

    struct MockHistory {
        records: Vec<StoredVersion>,
        next_index: usize,
        calls: Shared<Calls>,
        faults: Shared<Faults>,
    }

    impl HistorySource for MockHistory {
        fn search(&mut self, _uri: &str, _key: &[u8]) -> CursorResult<()> {
            self.next_index = 0;
            self.calls.borrow_mut().history_searches += 1;
            Ok(())
        }

        fn next(&mut self) -> CursorResult<Option<StoredVersion>> {
            if self.faults.borrow().history_next {
                return Err(StorageError::data_corruption("bad history").into());
            }
            let record = self.records.get(self.next_index).cloned();
            self.next_index += 1;
            Ok(record)
        }

        fn reset(&mut self) -> CursorResult<()> {
            self.calls.borrow_mut().history_resets += 1;
            if self.faults.borrow().history_reset {
                return Err(CursorError::InvalidState("history reset failed"));
            }
            Ok(())
        }

        fn close(&mut self) -> CursorResult<()> {
            self.calls.borrow_mut().history_closes += 1;
            if self.faults.borrow().history_close {
                return Err(CursorError::InvalidState("history close failed"));
            }
            Ok(())
        }
    }

    fn chain_entry(
        commit: u64,
        ts: u64,
        payload: VersionPayload,
        older: Option<usize>,
    ) -> ChainEntry {
        ChainEntry {
            commit_id: CommitId::new(commit),
            revision: 0,
            start_ts: Some(ts),
            durable_ts: ts,
            payload,
            older: older.map(handle),
        }
    }

    fn stored(commit: u64, ts: u64, stop: Option<u64>, value: &[u8]) -> StoredVersion {
        StoredVersion {
            uri: "table:mock".to_string(),
            key: b"k".to_vec(),
            commit_id: CommitId::new(commit),
            revision: 0,
            start_ts: Some(ts),
            durable_ts: ts,
            stop_ts: stop,
            is_tombstone: false,
            value: value.to_vec(),
        }
    }

    struct Harness {
        calls: Shared<Calls>,
        faults: Shared<Faults>,
        metrics: Arc<MetricsRegistry>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                calls: Rc::default(),
                faults: Rc::default(),
                metrics: Arc::new(MetricsRegistry::new()),
            }
        }

        fn cursor(
            &self,
            chain: Vec<ChainEntry>,
            on_disk: Option<StoredVersion>,
            history: Vec<StoredVersion>,
        ) -> VersionCursor<MockBase, MockHistory> {
            VersionCursor::new(
                MockBase {
                    chain,
                    on_disk,
                    has_slot: true,
                    positioned: false,
                    calls: self.calls.clone(),
                    faults: self.faults.clone(),
                },
                MockHistory {
                    records: history,
                    next_index: 0,
                    calls: self.calls.clone(),
                    faults: self.faults.clone(),
                },
                self.metrics.clone(),
            )
        }

        /// chain [v3, v2], on-disk v1, history [v0]
        fn layered(&self) -> VersionCursor<MockBase, MockHistory> {
            self.cursor(
                vec![
                    chain_entry(4, 40, VersionPayload::Document(b"v3".to_vec()), Some(1)),
                    chain_entry(3, 30, VersionPayload::Document(b"v2".to_vec()), None),
                ],
                Some(stored(2, 20, None, b"v1")),
                vec![stored(1, 10, Some(20), b"v0")],
            )
        }
    }

    fn drain(cursor: &mut VersionCursor<MockBase, MockHistory>) -> Vec<VersionRecord> {
        let mut out = Vec::new();
        while let Some(record) = cursor.next_version().unwrap() {
            out.push(record);
        }
        out
    }

    // =========================================================================
    // Traversal order
    // =========================================================================

    #[test]
    fn test_layers_emitted_in_order() {
        let h = Harness::new();
        let mut cursor = h.layered();
        cursor.search(b"k").unwrap();

        let records = drain(&mut cursor);
        let values: Vec<Vec<u8>> = records.iter().map(|r| r.value.clone()).collect();
        assert_eq!(
            values,
            vec![b"v3".to_vec(), b"v2".to_vec(), b"v1".to_vec(), b"v0".to_vec()]
        );

        let kinds: Vec<VersionKind> = records.iter().map(|r| r.metadata.kind).collect();
        assert_eq!(
            kinds,
            vec![
                VersionKind::Update,
                VersionKind::Update,
                VersionKind::OnDisk,
                VersionKind::History
            ]
        );
        assert!(records
            .windows(2)
            .all(|w| w[0].metadata.commit_id > w[1].metadata.commit_id));
    }

    #[test]
    fn test_stop_markers_follow_newer_start() {
        let h = Harness::new();
        let mut cursor = h.layered();
        cursor.search(b"k").unwrap();

        let stops: Vec<Option<u64>> = drain(&mut cursor)
            .iter()
            .map(|r| r.metadata.stop_ts)
            .collect();
        assert_eq!(stops, vec![None, Some(40), Some(30), Some(20)]);
    }

    #[test]
    fn test_tombstone_on_chain_is_emitted_with_empty_value() {
        let h = Harness::new();
        let mut cursor = h.cursor(
            vec![
                chain_entry(5, 50, VersionPayload::Tombstone, Some(1)),
                chain_entry(4, 40, VersionPayload::Document(b"v".to_vec()), None),
            ],
            None,
            Vec::new(),
        );
        cursor.search(b"k").unwrap();

        cursor.next().unwrap();
        assert_eq!(cursor.get_key().unwrap().metadata.kind, VersionKind::Tombstone);
        assert!(cursor.get_value().unwrap().is_empty());

        cursor.next().unwrap();
        assert_eq!(cursor.get_key().unwrap().metadata.stop_ts, Some(50));
        assert!(cursor.next().unwrap_err().is_not_found());
    }

    #[test]
    fn test_no_chain_starts_on_disk() {
        let h = Harness::new();
        let mut cursor = h.cursor(Vec::new(), Some(stored(2, 20, None, b"v1")), Vec::new());
        cursor.search(b"k").unwrap();
        assert!(cursor.flags().chain_exhausted);

        cursor.next().unwrap();
        assert_eq!(cursor.get_key().unwrap().metadata.kind, VersionKind::OnDisk);
        assert_eq!(cursor.phase(), Some(Phase::History));
    }

    #[test]
    fn test_missing_on_disk_falls_through_to_history() {
        let h = Harness::new();
        let mut cursor = h.cursor(
            Vec::new(),
            None,
            vec![stored(3, 30, Some(40), b"vA"), stored(2, 20, Some(30), b"vB")],
        );
        cursor.search(b"k").unwrap();

        let values: Vec<Vec<u8>> = drain(&mut cursor).into_iter().map(|r| r.value).collect();
        assert_eq!(values, vec![b"vA".to_vec(), b"vB".to_vec()]);
    }

    #[test]
    fn test_history_not_older_than_last_emitted_is_skipped() {
        let h = Harness::new();
        let mut cursor = h.cursor(
            Vec::new(),
            Some(stored(5, 50, None, b"row")),
            vec![stored(5, 50, Some(60), b"dup"), stored(1, 10, Some(50), b"old")],
        );
        cursor.search(b"k").unwrap();

        let values: Vec<Vec<u8>> = drain(&mut cursor).into_iter().map(|r| r.value).collect();
        assert_eq!(values, vec![b"row".to_vec(), b"old".to_vec()]);
    }

    #[test]
    fn test_history_searched_lazily_once() {
        let h = Harness::new();
        let mut cursor = h.layered();
        cursor.search(b"k").unwrap();

        cursor.next().unwrap();
        cursor.next().unwrap();
        cursor.next().unwrap();
        assert_eq!(h.calls.borrow().history_searches, 0);

        drain(&mut cursor);
        assert_eq!(h.calls.borrow().history_searches, 1);
    }

    // =========================================================================
    // Exhaustion and reset
    // =========================================================================

    #[test]
    fn test_exhaustion_is_idempotent_and_keeps_position() {
        let h = Harness::new();
        let mut cursor = h.layered();
        cursor.search(b"k").unwrap();
        drain(&mut cursor);

        for _ in 0..3 {
            assert!(matches!(cursor.next(), Err(CursorError::NotFound)));
        }
        assert_eq!(cursor.phase(), Some(Phase::Exhausted));
        assert!(cursor.flags().history_exhausted);
        assert_eq!(h.metrics.snapshot().traversals_exhausted, 1);
        assert_eq!(h.metrics.snapshot().error_resets, 0);
    }

    #[test]
    fn test_get_key_after_exhaustion_is_invalid() {
        let h = Harness::new();
        let mut cursor = h.layered();
        cursor.search(b"k").unwrap();
        drain(&mut cursor);

        assert!(matches!(cursor.get_key(), Err(CursorError::InvalidState(_))));
        assert!(!cursor.is_positioned());
    }

    #[test]
    fn test_reset_restores_emptiness() {
        let h = Harness::new();
        let mut cursor = h.layered();
        cursor.search(b"k").unwrap();
        cursor.next().unwrap();

        cursor.reset().unwrap();
        assert!(matches!(cursor.get_key(), Err(CursorError::InvalidState(_))));
        assert!(matches!(cursor.next(), Err(CursorError::InvalidState(_))));
        assert!(matches!(cursor.get_value(), Err(CursorError::InvalidState(_))));
    }

    #[test]
    fn test_research_restarts_traversal() {
        let h = Harness::new();
        let mut cursor = h.layered();
        cursor.search(b"k").unwrap();
        drain(&mut cursor);

        cursor.search(b"k").unwrap();
        assert_eq!(drain(&mut cursor).len(), 4);
    }

    #[test]
    fn test_search_miss_resets() {
        let h = Harness::new();
        let mut cursor = h.layered();
        cursor.base.as_mut().unwrap().has_slot = false;

        assert!(matches!(cursor.search(b"k"), Err(CursorError::NotFound)));
        assert!(!cursor.is_positioned());
        assert!(h.calls.borrow().base_resets >= 1);
    }

    #[test]
    fn test_search_miss_is_not_found_when_reset_fails() {
        let h = Harness::new();
        let mut cursor = h.layered();
        cursor.base.as_mut().unwrap().has_slot = false;
        h.faults.borrow_mut().base_reset = true;

        assert!(matches!(cursor.search(b"k"), Err(CursorError::NotFound)));
        assert!(!cursor.is_positioned());
    }

    #[test]
    fn test_reset_runs_every_path_and_keeps_first_error() {
        let h = Harness::new();
        let mut cursor = h.layered();
        cursor.search(b"k").unwrap();
        cursor.next().unwrap();
        {
            let mut faults = h.faults.borrow_mut();
            faults.base_reset = true;
            faults.history_reset = true;
        }
        let history_resets = h.calls.borrow().history_resets;

        let err = cursor.reset().unwrap_err();
        assert!(matches!(err, CursorError::InvalidState("base reset failed")));
        assert_eq!(h.calls.borrow().history_resets, history_resets + 1);
        assert!(!cursor.is_positioned());
        assert!(cursor.current().is_none());
    }

    #[test]
    fn test_get_key_before_next_is_invalid() {
        let h = Harness::new();
        let mut cursor = h.layered();
        cursor.search(b"k").unwrap();

        assert!(matches!(cursor.get_key(), Err(CursorError::InvalidState(_))));
        assert!(!cursor.is_positioned());

        cursor.search(b"k").unwrap();
        assert!(matches!(cursor.get_value(), Err(CursorError::InvalidState(_))));
        assert!(!cursor.is_positioned());
    }

    #[test]
    fn test_next_without_search_is_invalid() {
        let h = Harness::new();
        let mut cursor = h.layered();

        assert!(matches!(cursor.next(), Err(CursorError::InvalidState(_))));
        assert!(cursor.current().is_none());
    }

    // =========================================================================
    // Failures
    // =========================================================================

    #[test]
    fn test_storage_error_resets_and_propagates() {
        let h = Harness::new();
        let mut cursor = h.layered();
        cursor.search(b"k").unwrap();
        cursor.next().unwrap();
        cursor.next().unwrap();

        h.faults.borrow_mut().on_disk = true;
        let err = cursor.next().unwrap_err();
        assert_eq!(err.code(), "STRATA_DATA_CORRUPTION");
        assert!(!cursor.is_positioned());
        assert_eq!(h.metrics.snapshot().error_resets, 1);
    }

    #[test]
    fn test_history_error_resets() {
        let h = Harness::new();
        let mut cursor = h.cursor(Vec::new(), None, vec![stored(1, 1, Some(2), b"v")]);
        cursor.search(b"k").unwrap();

        h.faults.borrow_mut().history_next = true;
        assert!(matches!(cursor.next(), Err(CursorError::Storage(_))));
        assert!(!cursor.is_positioned());
    }

    #[test]
    fn test_stale_chain_is_counted() {
        let h = Harness::new();
        let mut cursor = h.cursor(
            vec![chain_entry(2, 2, VersionPayload::Document(b"v".to_vec()), Some(7))],
            None,
            Vec::new(),
        );
        cursor.search(b"k").unwrap();
        cursor.next().unwrap();

        assert!(matches!(cursor.next(), Err(CursorError::StaleChain)));
        assert_eq!(h.metrics.snapshot().stale_chain_errors, 1);
        assert!(!cursor.is_positioned());
    }

    // =========================================================================
    // Close
    // =========================================================================

    #[test]
    fn test_close_aggregates_and_closes_both() {
        let h = Harness::new();
        {
            let mut faults = h.faults.borrow_mut();
            faults.base_close = true;
            faults.history_close = true;
        }
        let mut cursor = h.layered();

        let err = cursor.close().unwrap_err();
        assert!(err.to_string().contains("base close failed"));
        assert_eq!(h.calls.borrow().base_closes, 1);
        assert_eq!(h.calls.borrow().history_closes, 1);

        cursor.close().unwrap();
        drop(cursor);
        assert_eq!(h.calls.borrow().base_closes, 1);
        assert_eq!(h.metrics.snapshot().cursors_closed, 1);
    }

    #[test]
    fn test_drop_closes_unclosed_cursor() {
        let h = Harness::new();
        drop(h.layered());
        assert_eq!(h.calls.borrow().base_closes, 1);
        assert_eq!(h.calls.borrow().history_closes, 1);
    }

    #[test]
    fn test_closed_cursor_rejects_search() {
        let h = Harness::new();
        let mut cursor = h.layered();
        cursor.close().unwrap();
        assert!(cursor.is_closed());
        assert!(matches!(cursor.search(b"k"), Err(CursorError::InvalidState(_))));
    }

    // =========================================================================
    // Contract surface
    // =========================================================================

    #[test]
    fn test_formats() {
        let h = Harness::new();
        let cursor = h.layered();
        assert_eq!(cursor.key_format(), "QQQQQBBB");
        assert_eq!(cursor.value_format(), "u");
        assert_eq!(cursor.uri(), "table:mock");
    }

    #[test]
    fn test_unsupported_operations_are_counted() {
        let h = Harness::new();
        let mut cursor = h.layered();

        assert!(matches!(cursor.insert(), Err(CursorError::NotSupported("insert"))));
        assert!(matches!(cursor.prev(), Err(CursorError::NotSupported("prev"))));
        assert!(matches!(
            cursor.modify(0, b"x"),
            Err(CursorError::NotSupported("modify"))
        ));
        assert_eq!(h.metrics.snapshot().unsupported_calls, 3);
    }
}
