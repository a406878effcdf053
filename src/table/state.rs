//! Table state and writes
//!
//! A table maps each key to a slot: the reconciled row (if any) plus the
//! head of its pending update chain. Writes prepend to the chain under the
//! table write lock; `reconcile` folds chains into rows and history.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::history::HistoryStore;
use crate::mvcc::{CommitAuthority, CommitId, Timestamp, VersionPayload};
use crate::storage::{load_records, StorageError, StorageWriter, StoredVersion};

use super::update::{UpdateArena, UpdateNode};
use super::{TableCursor, TableError, TableResult, WriteBatch};

/// One key's slot.
///
/// A slot without a row is on the insert list: the key has only ever been
/// written in memory. Reconciliation gives it a row and bumps the
/// generation.
#[derive(Debug, Default)]
pub(crate) struct Slot {
    pub(crate) generation: u64,
    pub(crate) head: Option<usize>,
    pub(crate) row: Option<StoredVersion>,
}

impl Slot {
    fn is_live(&self, arena: &UpdateArena) -> bool {
        match self.head.and_then(|head| arena.get(head)) {
            Some(node) => !node.payload.is_tombstone(),
            None => self.row.as_ref().map_or(false, |row| !row.is_tombstone),
        }
    }
}

pub(crate) struct TableState {
    pub(crate) uri: String,
    pub(crate) value_format: String,
    pub(crate) slots: BTreeMap<Vec<u8>, Slot>,
    pub(crate) arena: UpdateArena,
    base: StorageWriter,
}

impl TableState {
    fn is_live(&self, key: &[u8]) -> bool {
        self.slots
            .get(key)
            .map_or(false, |slot| slot.is_live(&self.arena))
    }

    fn prepend(&mut self, key: Vec<u8>, mut node: UpdateNode) {
        let slot = self.slots.entry(key).or_default();
        node.older = slot.head;
        slot.head = Some(self.arena.alloc(node));
    }
}

/// Counts from one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Keys whose update chain was written out
    pub keys: usize,
    /// Records moved to the history store
    pub history_records: usize,
}

/// Shared handle to a table.
#[derive(Clone)]
pub struct Table {
    inner: Arc<RwLock<TableState>>,
    authority: Arc<Mutex<CommitAuthority>>,
    history: HistoryStore,
}

impl Table {
    /// Opens the table whose base file is at `base_path`.
    ///
    /// The latest record per key wins. Every commit id read back is folded
    /// into `authority`.
    pub fn open(
        uri: &str,
        value_format: &str,
        base_path: &Path,
        sync_writes: bool,
        authority: Arc<Mutex<CommitAuthority>>,
        history: HistoryStore,
    ) -> TableResult<Self> {
        let mut slots = BTreeMap::new();
        {
            let mut commits = authority.lock().unwrap_or_else(PoisonError::into_inner);
            for record in load_records(base_path)? {
                if record.uri != uri {
                    return Err(StorageError::data_corruption(format!(
                        "record for {} in base file of {}",
                        record.uri, uri
                    ))
                    .into());
                }
                commits.observe(record.commit_id);
                slots.insert(
                    record.key.clone(),
                    Slot {
                        generation: 0,
                        head: None,
                        row: Some(record),
                    },
                );
            }
        }

        let base = StorageWriter::open(base_path, sync_writes)?;
        Ok(Self {
            inner: Arc::new(RwLock::new(TableState {
                uri: uri.to_string(),
                value_format: value_format.to_string(),
                slots,
                arena: UpdateArena::new(),
                base,
            })),
            authority,
            history,
        })
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, TableState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, TableState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn assign_commit_id(&self) -> TableResult<CommitId> {
        let mut authority = self.authority.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(authority.assign()?)
    }

    pub fn uri(&self) -> String {
        self.read().uri.clone()
    }

    pub fn value_format(&self) -> String {
        self.read().value_format.clone()
    }

    /// Number of keys with a slot, removed keys included.
    pub fn len(&self) -> usize {
        self.read().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of update chain nodes not yet reconciled.
    pub fn pending_updates(&self) -> usize {
        self.read().arena.live()
    }

    /// Opens a read-only cursor.
    pub fn open_cursor(&self) -> TableCursor {
        TableCursor::new(self.clone())
    }

    /// Writes `value` for `key`, replacing any current value.
    pub fn insert(&self, key: &[u8], value: &[u8], ts: Option<Timestamp>) -> TableResult<CommitId> {
        let mut state = self.write();
        let commit_id = self.assign_commit_id()?;
        state.prepend(
            key.to_vec(),
            UpdateNode::new(commit_id, 0, ts, VersionPayload::Document(value.to_vec())),
        );
        Ok(commit_id)
    }

    /// Like [`Table::insert`], but the key must currently have a value.
    pub fn update(&self, key: &[u8], value: &[u8], ts: Option<Timestamp>) -> TableResult<CommitId> {
        let mut state = self.write();
        if !state.is_live(key) {
            return Err(TableError::KeyNotFound);
        }
        let commit_id = self.assign_commit_id()?;
        state.prepend(
            key.to_vec(),
            UpdateNode::new(commit_id, 0, ts, VersionPayload::Document(value.to_vec())),
        );
        Ok(commit_id)
    }

    /// Removes `key`. Nothing is written when the key has no value.
    pub fn remove(&self, key: &[u8], ts: Option<Timestamp>) -> TableResult<Option<CommitId>> {
        let mut state = self.write();
        if !state.is_live(key) {
            return Ok(None);
        }
        let commit_id = self.assign_commit_id()?;
        state.prepend(
            key.to_vec(),
            UpdateNode::new(commit_id, 0, ts, VersionPayload::Tombstone),
        );
        Ok(Some(commit_id))
    }

    /// Applies `batch` under a single commit id.
    ///
    /// Removals of keys without a value are skipped and take no revision.
    /// Returns `None` when nothing was written.
    pub fn commit(&self, batch: WriteBatch) -> TableResult<Option<CommitId>> {
        let mut state = self.write();
        let mut commit_id = None;
        let mut revision = 0;

        for (key, payload) in batch.ops {
            if payload.is_tombstone() && !state.is_live(&key) {
                continue;
            }
            let id = match commit_id {
                Some(id) => id,
                None => {
                    let id = self.assign_commit_id()?;
                    commit_id = Some(id);
                    id
                }
            };
            state.prepend(key, UpdateNode::new(id, revision, batch.ts, payload));
            revision += 1;
        }

        Ok(commit_id)
    }

    /// Moves every update chain out of memory.
    ///
    /// Per key, the newest chain entry becomes the row, written to the base
    /// file (a removal as a tombstone record). Older values, and the row
    /// they replace, go to the history store with their stop marker set to
    /// the start of the next newer version. Tombstones never reach history;
    /// they only close the value before them.
    pub fn reconcile(&self) -> TableResult<ReconcileStats> {
        let mut guard = self.write();
        let state = &mut *guard;

        let mut rows = Vec::new();
        let mut history_records = Vec::new();

        for (key, slot) in &state.slots {
            let Some(head) = slot.head else { continue };

            let mut versions = state
                .arena
                .chain(head)
                .map(|node| stored(&state.uri, key, node))
                .chain(slot.row.clone());
            let Some(row) = versions.next() else { continue };

            let mut newer_start = row.start_ts;
            for mut version in versions {
                let start = version.start_ts;
                if !version.is_tombstone {
                    version.stop_ts = Some(newer_start.unwrap_or(0));
                    history_records.push(version);
                }
                newer_start = start;
            }

            rows.push((key.clone(), head, row));
        }

        let stats = ReconcileStats {
            keys: rows.len(),
            history_records: history_records.len(),
        };
        if rows.is_empty() {
            return Ok(stats);
        }

        self.history.append(history_records)?;
        let base_records: Vec<StoredVersion> = rows.iter().map(|(_, _, row)| row.clone()).collect();
        state.base.append_all(&base_records)?;

        for (key, head, row) in rows {
            state.arena.free_chain(head);
            if let Some(slot) = state.slots.get_mut(&key) {
                slot.head = None;
                slot.row = Some(row);
                slot.generation += 1;
            }
        }

        Ok(stats)
    }
}

fn stored(uri: &str, key: &[u8], node: &UpdateNode) -> StoredVersion {
    StoredVersion {
        uri: uri.to_string(),
        key: key.to_vec(),
        commit_id: node.commit_id,
        revision: node.revision,
        start_ts: node.start_ts,
        durable_ts: node.durable_ts,
        stop_ts: None,
        is_tombstone: node.payload.is_tombstone(),
        value: node.payload.bytes().to_vec(),
    }
}
