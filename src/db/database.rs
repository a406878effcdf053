//! Database handle
//!
//! Opening reads back the catalog, every base file and the history store,
//! verifying checksums and restoring the commit id high-water mark.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::DbConfig;
use crate::cursor::VersionCursor;
use crate::history::{HistoryCursor, HistoryStore};
use crate::mvcc::{CommitAuthority, CommitId};
use crate::observability::{log_event_with_fields, Event, Logger, MetricsRegistry};
use crate::storage::StorageError;
use crate::table::{ReconcileStats, Table, TableCursor};

use super::catalog::{Catalog, CatalogEntry};
use super::{DbError, DbResult};

/// Version cursor over a database table.
pub type DbVersionCursor = VersionCursor<TableCursor, HistoryCursor>;

const URI_PREFIX: &str = "table:";

/// Table name of a `table:<name>` URI.
fn table_name(uri: &str) -> DbResult<&str> {
    let name = uri
        .strip_prefix(URI_PREFIX)
        .ok_or_else(|| DbError::InvalidUri(uri.to_string()))?;
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(name)
    } else {
        Err(DbError::InvalidUri(uri.to_string()))
    }
}

/// An open database: catalog, tables, history store and commit authority.
pub struct Database {
    config: DbConfig,
    catalog: Catalog,
    tables: BTreeMap<String, Table>,
    history: HistoryStore,
    authority: Arc<Mutex<CommitAuthority>>,
    metrics: Arc<MetricsRegistry>,
    closed: bool,
}

impl Database {
    /// Opens (creating if needed) the database under `config.data_dir`.
    ///
    /// Every data file is read back and checksum-verified; corruption fails
    /// the open.
    pub fn open(config: DbConfig) -> DbResult<Self> {
        config.validate()?;
        Logger::set_min_severity(config.log_severity());
        let sync_writes = config.sync_writes.to_string();
        log_event_with_fields(
            Event::ConfigLoaded,
            &[
                ("log_level", config.log_level.as_str()),
                ("sync_writes", sync_writes.as_str()),
            ],
        );

        let result = Self::load(config);
        if let Err(err) = &result {
            if err.is_fatal() {
                let error = err.to_string();
                log_event_with_fields(Event::DataCorruption, &[("error", error.as_str())]);
            }
        }
        result
    }

    fn load(config: DbConfig) -> DbResult<Self> {
        fs::create_dir_all(config.tables_dir()).map_err(|e| {
            StorageError::io_error(
                format!("Failed to create {}", config.tables_dir().display()),
                e,
            )
        })?;

        let catalog = Catalog::load(&config.catalog_path())?;
        let history = HistoryStore::open(&config.history_path(), config.sync_writes)?;

        let mut authority = CommitAuthority::new();
        if let Some(highest) = history.highest_commit_id() {
            authority.observe(highest);
        }
        let authority = Arc::new(Mutex::new(authority));

        let mut tables = BTreeMap::new();
        for entry in &catalog.tables {
            table_name(&entry.uri)?;
            let table = Table::open(
                &entry.uri,
                &entry.value_format,
                &config.data_dir.join(&entry.file),
                config.sync_writes,
                authority.clone(),
                history.clone(),
            )?;
            tables.insert(entry.uri.clone(), table);
        }

        let db = Self {
            config,
            catalog,
            tables,
            history,
            authority,
            metrics: Arc::new(MetricsRegistry::new()),
            closed: false,
        };

        let data_dir = db.config.data_dir.display().to_string();
        let table_count = db.tables.len().to_string();
        let highest = db
            .highest_commit_id()
            .map_or_else(|| "none".to_string(), |c| c.to_string());
        log_event_with_fields(
            Event::DatabaseOpened,
            &[
                ("data_dir", data_dir.as_str()),
                ("highest_commit_id", highest.as_str()),
                ("tables", table_count.as_str()),
            ],
        );
        Ok(db)
    }

    fn check_open(&self) -> DbResult<()> {
        if self.closed {
            Err(DbError::Closed)
        } else {
            Ok(())
        }
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    pub fn metrics(&self) -> Arc<MetricsRegistry> {
        self.metrics.clone()
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Highest commit id assigned or read back so far.
    pub fn highest_commit_id(&self) -> Option<CommitId> {
        self.authority
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .highest_commit_id()
    }

    /// URIs of every table, sorted.
    pub fn table_uris(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    /// Creates table `uri` (`table:<name>`) holding values in `value_format`.
    pub fn create_table(&mut self, uri: &str, value_format: &str) -> DbResult<Table> {
        self.check_open()?;
        let name = table_name(uri)?;
        if self.tables.contains_key(uri) {
            return Err(DbError::TableExists(uri.to_string()));
        }

        let file = PathBuf::from("tables").join(format!("{}.dat", name));
        let table = Table::open(
            uri,
            value_format,
            &self.config.data_dir.join(&file),
            self.config.sync_writes,
            self.authority.clone(),
            self.history.clone(),
        )?;

        self.catalog.tables.push(CatalogEntry {
            uri: uri.to_string(),
            value_format: value_format.to_string(),
            file,
        });
        if let Err(err) = self.catalog.save(&self.config.catalog_path()) {
            self.catalog.tables.pop();
            return Err(err.into());
        }

        self.tables.insert(uri.to_string(), table.clone());
        log_event_with_fields(
            Event::TableCreated,
            &[("uri", uri), ("value_format", value_format)],
        );
        Ok(table)
    }

    pub fn table(&self, uri: &str) -> DbResult<Table> {
        self.check_open()?;
        self.tables
            .get(uri)
            .cloned()
            .ok_or_else(|| DbError::TableNotFound(uri.to_string()))
    }

    /// Opens a read-only version cursor on table `uri`.
    pub fn open_version_cursor(&self, uri: &str) -> DbResult<DbVersionCursor> {
        let table = self.table(uri)?;
        Ok(VersionCursor::new(
            table.open_cursor(),
            self.history.open_cursor(),
            self.metrics.clone(),
        ))
    }

    /// Reconciles every table.
    pub fn checkpoint(&self) -> DbResult<ReconcileStats> {
        self.check_open()?;
        log_event_with_fields(Event::CheckpointBegin, &[]);

        let mut total = ReconcileStats::default();
        for (uri, table) in &self.tables {
            let stats = match table.reconcile() {
                Ok(stats) => stats,
                Err(err) => {
                    let error = err.to_string();
                    log_event_with_fields(
                        Event::CheckpointFailed,
                        &[("error", error.as_str()), ("uri", uri.as_str())],
                    );
                    return Err(err.into());
                }
            };
            if stats.keys > 0 {
                self.metrics
                    .record_reconciliation(stats.history_records as u64);
                let keys = stats.keys.to_string();
                let history_records = stats.history_records.to_string();
                log_event_with_fields(
                    Event::TableReconciled,
                    &[
                        ("history_records", history_records.as_str()),
                        ("keys", keys.as_str()),
                        ("uri", uri.as_str()),
                    ],
                );
            }
            total.keys += stats.keys;
            total.history_records += stats.history_records;
        }

        let keys = total.keys.to_string();
        log_event_with_fields(Event::CheckpointComplete, &[("keys", keys.as_str())]);
        Ok(total)
    }

    /// Closes the database, checkpointing first when configured to.
    /// Closing twice is a no-op.
    pub fn close(&mut self) -> DbResult<()> {
        if self.closed {
            return Ok(());
        }
        let result = if self.config.checkpoint_on_close {
            self.checkpoint().map(|_| ())
        } else {
            Ok(())
        };
        self.closed = true;
        let data_dir = self.config.data_dir.display().to_string();
        log_event_with_fields(Event::DatabaseClosed, &[("data_dir", data_dir.as_str())]);
        result
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
