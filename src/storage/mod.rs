//! Append-only record storage for stratakv
//!
//! Base files and the history store share one record format. Files are
//! append-only with no in-place updates.
//!
//! # Design Principles
//!
//! - Append-only (no in-place updates)
//! - Checksum-verified on every read
//! - Latest record wins for the same key in a base file
//! - Corruption halts the load

mod checksum;
mod errors;
mod reader;
mod record;
mod writer;

pub use checksum::compute_checksum;
pub use errors::{Severity, StorageError, StorageErrorCode, StorageResult};
pub use reader::{load_records, StorageReader};
pub use record::StoredVersion;
pub use writer::StorageWriter;
