//! Tables
//!
//! A table keeps, per key, an in-memory update chain (newest first) and the
//! reconciled row from its base file. Writes only ever prepend to chains;
//! [`Table::reconcile`] moves chains into the base file and the history
//! store.
//!
//! Cursors opened on a table are read-only.

mod batch;
mod cursor;
mod errors;
mod state;
mod update;

pub use batch::WriteBatch;
pub use cursor::{SlotProbe, TableCursor};
pub use errors::{TableError, TableResult};
pub use state::{ReconcileStats, Table};
pub use update::{ChainEntry, ChainHandle, UpdateNode};
