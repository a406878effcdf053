//! Cursor seams
//!
//! [`Cursor`] is the public contract. [`BaseCursor`] and [`HistorySource`]
//! are what the version cursor consumes from the table and the history store.

use crate::storage::StoredVersion;
use crate::table::{ChainEntry, ChainHandle, SlotProbe};

use super::{CursorError, CursorResult, VersionKey};

/// Public cursor contract.
///
/// Operations a cursor does not provide keep the default body and fail with
/// [`CursorError::NotSupported`].
pub trait Cursor {
    /// URI of the data source.
    fn uri(&self) -> &str;

    /// Format string of keys returned by [`Cursor::get_key`].
    fn key_format(&self) -> &str;

    /// Format string of values returned by [`Cursor::get_value`].
    fn value_format(&self) -> &str;

    fn set_key(&mut self, key: &[u8]) -> CursorResult<()>;

    fn search(&mut self, key: &[u8]) -> CursorResult<()>;

    fn next(&mut self) -> CursorResult<()>;

    fn get_key(&mut self) -> CursorResult<VersionKey>;

    fn get_value(&mut self) -> CursorResult<Vec<u8>>;

    fn reset(&mut self) -> CursorResult<()>;

    fn close(&mut self) -> CursorResult<()>;

    /// Called before every unsupported operation fails.
    fn on_unsupported(&mut self, _op: &'static str) {}

    fn set_value(&mut self, _value: &[u8]) -> CursorResult<()> {
        self.on_unsupported("set_value");
        Err(CursorError::NotSupported("set_value"))
    }

    fn compare(&mut self, _other: &Self) -> CursorResult<std::cmp::Ordering>
    where
        Self: Sized,
    {
        self.on_unsupported("compare");
        Err(CursorError::NotSupported("compare"))
    }

    fn equals(&mut self, _other: &Self) -> CursorResult<bool>
    where
        Self: Sized,
    {
        self.on_unsupported("equals");
        Err(CursorError::NotSupported("equals"))
    }

    fn insert(&mut self) -> CursorResult<()> {
        self.on_unsupported("insert");
        Err(CursorError::NotSupported("insert"))
    }

    fn update(&mut self) -> CursorResult<()> {
        self.on_unsupported("update");
        Err(CursorError::NotSupported("update"))
    }

    fn remove(&mut self) -> CursorResult<()> {
        self.on_unsupported("remove");
        Err(CursorError::NotSupported("remove"))
    }

    fn reserve(&mut self) -> CursorResult<()> {
        self.on_unsupported("reserve");
        Err(CursorError::NotSupported("reserve"))
    }

    fn modify(&mut self, _offset: usize, _data: &[u8]) -> CursorResult<()> {
        self.on_unsupported("modify");
        Err(CursorError::NotSupported("modify"))
    }

    fn search_near(&mut self, _key: &[u8]) -> CursorResult<std::cmp::Ordering> {
        self.on_unsupported("search_near");
        Err(CursorError::NotSupported("search_near"))
    }

    fn prev(&mut self) -> CursorResult<()> {
        self.on_unsupported("prev");
        Err(CursorError::NotSupported("prev"))
    }

    fn largest_key(&mut self) -> CursorResult<()> {
        self.on_unsupported("largest_key");
        Err(CursorError::NotSupported("largest_key"))
    }

    fn cache(&mut self) -> CursorResult<()> {
        self.on_unsupported("cache");
        Err(CursorError::NotSupported("cache"))
    }

    fn reopen(&mut self) -> CursorResult<()> {
        self.on_unsupported("reopen");
        Err(CursorError::NotSupported("reopen"))
    }
}

/// Read-only cursor over a table's slots.
pub trait BaseCursor {
    fn uri(&self) -> &str;

    fn value_format(&self) -> &str;

    fn set_key(&mut self, key: &[u8]);

    /// Positions on the key last set without materializing its value.
    ///
    /// `Ok(None)` when the table has no slot for the key.
    fn search_key_only(&mut self) -> CursorResult<Option<SlotProbe>>;

    /// Resolves one node of the positioned key's update chain.
    fn chain_entry(&mut self, handle: ChainHandle) -> CursorResult<ChainEntry>;

    /// The positioned key's live on-disk value; `None` when the key was
    /// never reconciled or was reconciled as removed.
    fn on_disk(&mut self) -> CursorResult<Option<StoredVersion>>;

    fn reset(&mut self) -> CursorResult<()>;

    fn close(&mut self) -> CursorResult<()>;
}

/// Ordered access to one key's history records.
pub trait HistorySource {
    /// Positions on `uri`/`key`; the next record returned is the newest.
    fn search(&mut self, uri: &str, key: &[u8]) -> CursorResult<()>;

    /// Next older record, `None` once the key has no more.
    fn next(&mut self) -> CursorResult<Option<StoredVersion>>;

    fn reset(&mut self) -> CursorResult<()>;

    fn close(&mut self) -> CursorResult<()>;
}
