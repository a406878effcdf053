//! CLI module for stratakv
//!
//! Provides command-line interface for:
//! - init: Create the data directory and an empty catalog
//! - create-table: Register a table
//! - put / delete: Write to a table
//! - versions: Print every version of a key as JSON lines
//! - checkpoint: Reconcile every table

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{checkpoint, create_table, delete, init, put, run, run_command, versions};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::write_json_line;
