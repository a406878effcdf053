//! stratakv - a key-value store that can replay every version of a key
//!
//! Writes land on per-key in-memory update chains. A checkpoint reconciles
//! them: the newest value becomes the on-disk base row and the values it
//! replaces move to the history store. A version cursor walks all three
//! layers for one key, newest first.

pub mod cli;
pub mod config;
pub mod cursor;
pub mod db;
pub mod history;
pub mod mvcc;
pub mod observability;
pub mod storage;
pub mod table;

pub use config::{ConfigError, DbConfig};
pub use cursor::{Cursor, CursorError, CursorResult, VersionCursor, VersionKey, VersionRecord};
pub use db::{Database, DbError, DbResult, DbVersionCursor};
pub use mvcc::{CommitId, Timestamp, VersionKind, VersionMetadata};
