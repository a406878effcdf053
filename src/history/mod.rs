//! History store
//!
//! Values pushed out of an update chain by reconciliation land here, in one
//! append-only file shared by every table. An in-memory index ordered by
//! `(uri, key, commit_id, revision)` serves newest-first lookups per key.

mod cursor;
mod store;

pub use cursor::HistoryCursor;
pub use store::HistoryStore;
