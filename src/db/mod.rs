//! Database
//!
//! Ties tables, the history store and the commit authority together under
//! one data directory:
//!
//! ```text
//! <data_dir>/catalog.json
//! <data_dir>/tables/<name>.dat
//! <data_dir>/history/history.dat
//! ```

mod catalog;
mod database;
mod errors;

pub use catalog::{Catalog, CatalogEntry};
pub use database::{Database, DbVersionCursor};
pub use errors::{DbError, DbResult};
