//! History cursor
//!
//! Iterates one key's history records newest first. Each step resumes
//! strictly below the last record returned, so records appended meanwhile
//! cannot be returned twice.

use crate::cursor::{CursorError, CursorResult, HistorySource};
use crate::mvcc::CommitId;
use crate::storage::StoredVersion;

use super::HistoryStore;

/// Cursor over one key's history records, newest first.
///
/// Each `next` resumes strictly below the previously returned record, so
/// records appended while the cursor is positioned never repeat one already
/// returned.
pub struct HistoryCursor {
    store: HistoryStore,
    target: Option<(String, Vec<u8>)>,
    last: Option<(CommitId, u64)>,
    exhausted: bool,
    closed: bool,
}

impl HistoryCursor {
    pub(crate) fn new(store: HistoryStore) -> Self {
        Self {
            store,
            target: None,
            last: None,
            exhausted: false,
            closed: false,
        }
    }

    fn check_open(&self) -> CursorResult<()> {
        if self.closed {
            Err(CursorError::InvalidState("history cursor closed"))
        } else {
            Ok(())
        }
    }
}

impl HistorySource for HistoryCursor {
    fn search(&mut self, uri: &str, key: &[u8]) -> CursorResult<()> {
        self.check_open()?;
        self.target = Some((uri.to_string(), key.to_vec()));
        self.last = None;
        self.exhausted = false;
        Ok(())
    }

    fn next(&mut self) -> CursorResult<Option<StoredVersion>> {
        self.check_open()?;
        let (uri, key) = self
            .target
            .as_ref()
            .ok_or(CursorError::InvalidState("history cursor not positioned"))?;
        if self.exhausted {
            return Ok(None);
        }

        match self.store.newest_below(uri, key, self.last) {
            Some(record) => {
                self.last = Some((record.commit_id, record.revision));
                Ok(Some(record))
            }
            None => {
                self.exhausted = true;
                Ok(None)
            }
        }
    }

    fn reset(&mut self) -> CursorResult<()> {
        self.target = None;
        self.last = None;
        self.exhausted = false;
        Ok(())
    }

    fn close(&mut self) -> CursorResult<()> {
        self.reset()?;
        self.closed = true;
        Ok(())
    }
}
