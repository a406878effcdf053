//! Version cursor
//!
//! A read-only, time-travel cursor: given a key, it yields every version
//! ever written for it, newest first, from the update chain, then the
//! on-disk row, then the history store.
//!
//! ```ignore
//! let mut cursor = db.open_version_cursor("table:users")?;
//! cursor.search(b"alice")?;
//! while let Some(version) = cursor.next_version()? {
//!     println!("{:?} {:?}", version.metadata.kind, version.value);
//! }
//! cursor.close()?;
//! ```

mod errors;
mod key;
mod phase;
mod traits;
mod version_cursor;

pub use errors::{CursorError, CursorResult};
pub use key::{VersionKey, VersionRecord};
pub use phase::{Phase, PhaseFlags};
pub use traits::{BaseCursor, Cursor, HistorySource};
pub use version_cursor::VersionCursor;
