//! History store
//!
//! Versions replaced at reconciliation, appended to one checksummed file
//! shared by every table. On open the file is read back into an ordered
//! index keyed by (uri, key, commit id, revision); lookups never touch disk.
//!
//! Tombstones are never stored here.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::mvcc::CommitId;
use crate::storage::{load_records, StorageError, StorageResult, StorageWriter, StoredVersion};

use super::HistoryCursor;

type HistoryKey = (String, Vec<u8>, CommitId, u64);

struct HistoryState {
    writer: StorageWriter,
    index: BTreeMap<HistoryKey, StoredVersion>,
}

/// Shared handle to the history store.
#[derive(Clone)]
pub struct HistoryStore {
    inner: Arc<RwLock<HistoryState>>,
}

fn index_key(record: &StoredVersion) -> HistoryKey {
    (
        record.uri.clone(),
        record.key.clone(),
        record.commit_id,
        record.revision,
    )
}

impl HistoryStore {
    /// Opens the history file at `path`, loading every record into the index.
    ///
    /// Tombstones are never written to history, so finding one means the
    /// file cannot be trusted.
    pub fn open(path: &Path, sync_writes: bool) -> StorageResult<Self> {
        let mut index = BTreeMap::new();
        for record in load_records(path)? {
            if record.is_tombstone {
                return Err(StorageError::data_corruption(format!(
                    "tombstone for {} in history store at commit {}",
                    record.uri, record.commit_id
                )));
            }
            index.insert(index_key(&record), record);
        }

        let writer = StorageWriter::open(path, sync_writes)?;
        Ok(Self {
            inner: Arc::new(RwLock::new(HistoryState { writer, index })),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, HistoryState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HistoryState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Durably appends `records`, then makes them visible to cursors.
    pub fn append(&self, records: Vec<StoredVersion>) -> StorageResult<()> {
        let mut state = self.write();
        state.writer.append_all(&records)?;
        for record in records {
            state.index.insert(index_key(&record), record);
        }
        Ok(())
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.read().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Highest commit id of any record.
    pub fn highest_commit_id(&self) -> Option<CommitId> {
        self.read().index.keys().map(|(_, _, commit, _)| *commit).max()
    }

    /// Opens a cursor over this store.
    pub fn open_cursor(&self) -> HistoryCursor {
        HistoryCursor::new(self.clone())
    }

    /// Newest record of `uri`/`key` strictly older than `below`, or the
    /// newest record overall when `below` is `None`.
    pub(crate) fn newest_below(
        &self,
        uri: &str,
        key: &[u8],
        below: Option<(CommitId, u64)>,
    ) -> Option<StoredVersion> {
        let lower = Bound::Included((uri.to_string(), key.to_vec(), CommitId::new(0), 0));
        let upper = match below {
            Some((commit, revision)) => {
                Bound::Excluded((uri.to_string(), key.to_vec(), commit, revision))
            }
            None => Bound::Included((
                uri.to_string(),
                key.to_vec(),
                CommitId::new(u64::MAX),
                u64::MAX,
            )),
        };

        self.read()
            .index
            .range((lower, upper))
            .next_back()
            .map(|(_, record)| record.clone())
    }
}
