//! CLI command implementations
//!
//! Every command loads the config, opens the database, does one thing and
//! closes it again. Closing checkpoints (unless `checkpoint_on_close` is
//! off), so writes made by one invocation are on disk for the next.

use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::json;

use crate::config::DbConfig;
use crate::cursor::{Cursor, CursorError, VersionRecord};
use crate::db::{Catalog, Database, DbError};
use crate::mvcc::TS_MAX;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::write_json_line;

/// One version as printed by `versions`.
#[derive(Debug, Serialize)]
struct VersionLine {
    key: String,
    value: String,
    kind: &'static str,
    start_ts: Option<u64>,
    stop_ts: Option<u64>,
    commit_id: u64,
    revision: u64,
    durable_ts: u64,
}

impl From<&VersionRecord> for VersionLine {
    fn from(record: &VersionRecord) -> Self {
        let meta = &record.metadata;
        Self {
            key: String::from_utf8_lossy(&record.user_key).into_owned(),
            value: String::from_utf8_lossy(&record.value).into_owned(),
            kind: meta.kind.as_str(),
            start_ts: meta.start_ts,
            stop_ts: meta.stop_ts.filter(|ts| *ts != TS_MAX),
            commit_id: meta.commit_id.value(),
            revision: meta.revision,
            durable_ts: meta.durable_ts,
        }
    }
}

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_command(&cli.config, cli.command, &mut out)
}

/// Run one command, writing its output to `out`
pub fn run_command<W: Write>(config_path: &Path, cmd: Command, out: &mut W) -> CliResult<()> {
    match cmd {
        Command::Init => init(config_path),
        Command::CreateTable { uri, value_format } => {
            create_table(config_path, &uri, &value_format)
        }
        Command::Put {
            uri,
            key,
            value,
            ts,
        } => put(config_path, &uri, &key, &value, ts, out),
        Command::Delete { uri, key, ts } => delete(config_path, &uri, &key, ts, out),
        Command::Versions { uri, key } => versions(config_path, &uri, &key, out),
        Command::Checkpoint => checkpoint(config_path, out),
    }
}

fn is_initialized(config: &DbConfig) -> bool {
    config.catalog_path().exists()
}

/// Load config and open the database; the data directory must be initialized.
fn open_database(config_path: &Path) -> CliResult<Database> {
    let config = DbConfig::load(config_path)?;
    if !is_initialized(&config) {
        return Err(CliError::not_initialized());
    }
    Ok(Database::open(config)?)
}

/// Close explicitly so checkpoint failures surface as errors.
fn finish(mut db: Database) -> CliResult<()> {
    db.close()?;
    Ok(())
}

/// Initialize a new data directory
///
/// Creates the directory layout and an empty catalog.
pub fn init(config_path: &Path) -> CliResult<()> {
    let config = DbConfig::load(config_path)?;
    if is_initialized(&config) {
        return Err(CliError::already_initialized());
    }

    let catalog_path = config.catalog_path();
    let db = Database::open(config)?;
    Catalog::default()
        .save(&catalog_path)
        .map_err(DbError::from)?;
    finish(db)
}

pub fn create_table(config_path: &Path, uri: &str, value_format: &str) -> CliResult<()> {
    let mut db = open_database(config_path)?;
    db.create_table(uri, value_format)?;
    finish(db)
}

pub fn put<W: Write>(
    config_path: &Path,
    uri: &str,
    key: &str,
    value: &str,
    ts: Option<u64>,
    out: &mut W,
) -> CliResult<()> {
    let db = open_database(config_path)?;
    let table = db.table(uri)?;
    let commit_id = table
        .insert(key.as_bytes(), value.as_bytes(), ts)
        .map_err(DbError::from)?;
    write_json_line(out, &json!({ "commit_id": commit_id.value() }))?;
    finish(db)
}

pub fn delete<W: Write>(
    config_path: &Path,
    uri: &str,
    key: &str,
    ts: Option<u64>,
    out: &mut W,
) -> CliResult<()> {
    let db = open_database(config_path)?;
    let table = db.table(uri)?;
    let commit_id = table.remove(key.as_bytes(), ts).map_err(DbError::from)?;
    write_json_line(
        out,
        &json!({
            "removed": commit_id.is_some(),
            "commit_id": commit_id.map(|c| c.value()),
        }),
    )?;
    finish(db)
}

/// Print every version of `key`, newest first.
pub fn versions<W: Write>(config_path: &Path, uri: &str, key: &str, out: &mut W) -> CliResult<()> {
    let db = open_database(config_path)?;
    let mut cursor = db.open_version_cursor(uri)?;

    match cursor.search(key.as_bytes()) {
        Ok(()) => {}
        Err(CursorError::NotFound) => return Err(CliError::key_not_found(key)),
        Err(e) => return Err(DbError::from(e).into()),
    }
    while let Some(record) = cursor.next_version().map_err(DbError::from)? {
        write_json_line(out, &VersionLine::from(&record))?;
    }
    cursor.close().map_err(DbError::from)?;
    finish(db)
}

pub fn checkpoint<W: Write>(config_path: &Path, out: &mut W) -> CliResult<()> {
    let db = open_database(config_path)?;
    let stats = db.checkpoint()?;
    write_json_line(
        out,
        &json!({
            "keys": stats.keys,
            "history_records": stats.history_records,
        }),
    )?;
    finish(db)
}
