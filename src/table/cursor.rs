//! Read-only base cursor over one table

use crate::cursor::{BaseCursor, CursorError, CursorResult};
use crate::storage::StoredVersion;

use super::{ChainEntry, ChainHandle, Table};

/// What a metadata-only search learned about a key's slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotProbe {
    /// Newest update chain node, if the slot has pending updates
    pub chain_head: Option<ChainHandle>,
}

#[derive(Debug)]
struct Position {
    key: Vec<u8>,
    generation: u64,
}

/// Read-only cursor over a [`Table`].
///
/// Takes the table lock for the duration of each call only. A slot
/// reconciled after the cursor was positioned is reported as
/// [`CursorError::StaleChain`].
pub struct TableCursor {
    table: Table,
    uri: String,
    value_format: String,
    key: Option<Vec<u8>>,
    position: Option<Position>,
    closed: bool,
}

impl TableCursor {
    pub(crate) fn new(table: Table) -> Self {
        let (uri, value_format) = {
            let state = table.read();
            (state.uri.clone(), state.value_format.clone())
        };
        Self {
            table,
            uri,
            value_format,
            key: None,
            position: None,
            closed: false,
        }
    }

    fn check_open(&self) -> CursorResult<()> {
        if self.closed {
            Err(CursorError::InvalidState("table cursor closed"))
        } else {
            Ok(())
        }
    }
}

impl BaseCursor for TableCursor {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn value_format(&self) -> &str {
        &self.value_format
    }

    fn set_key(&mut self, key: &[u8]) {
        self.key = Some(key.to_vec());
        self.position = None;
    }

    fn search_key_only(&mut self) -> CursorResult<Option<SlotProbe>> {
        self.check_open()?;
        let key = self
            .key
            .as_ref()
            .ok_or(CursorError::InvalidState("key not set"))?;

        let state = self.table.read();
        let Some(slot) = state.slots.get(key) else {
            self.position = None;
            return Ok(None);
        };

        let probe = SlotProbe {
            chain_head: slot.head.and_then(|head| state.arena.handle(head)),
        };
        self.position = Some(Position {
            key: key.clone(),
            generation: slot.generation,
        });
        Ok(Some(probe))
    }

    fn chain_entry(&mut self, handle: ChainHandle) -> CursorResult<ChainEntry> {
        self.check_open()?;
        if self.position.is_none() {
            return Err(CursorError::InvalidState("table cursor not positioned"));
        }
        self.table
            .read()
            .arena
            .resolve(handle)
            .ok_or(CursorError::StaleChain)
    }

    fn on_disk(&mut self) -> CursorResult<Option<StoredVersion>> {
        self.check_open()?;
        let position = self
            .position
            .as_ref()
            .ok_or(CursorError::InvalidState("table cursor not positioned"))?;

        let state = self.table.read();
        let slot = state
            .slots
            .get(&position.key)
            .filter(|slot| slot.generation == position.generation)
            .ok_or(CursorError::StaleChain)?;

        Ok(slot.row.as_ref().filter(|row| !row.is_tombstone).cloned())
    }

    fn reset(&mut self) -> CursorResult<()> {
        self.key = None;
        self.position = None;
        Ok(())
    }

    fn close(&mut self) -> CursorResult<()> {
        self.reset()?;
        self.closed = true;
        Ok(())
    }
}
