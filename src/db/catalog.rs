//! Table catalog
//!
//! `catalog.json` lists every table with its value format and base file.
//! It is rewritten whole (temp file, fsync, rename) on every change.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::storage::{StorageError, StorageResult};

/// One table as recorded in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub uri: String,
    pub value_format: String,
    /// Base file, relative to the data directory
    pub file: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub tables: Vec<CatalogEntry>,
}

impl Catalog {
    /// Loads the catalog; a missing file is an empty catalog.
    pub fn load(path: &Path) -> StorageResult<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(StorageError::read_failed(
                    format!("Failed to read catalog: {}", path.display()),
                    e,
                ))
            }
        };

        let catalog: Catalog = serde_json::from_str(&content)
            .map_err(|e| StorageError::catalog(format!("Malformed catalog: {}", e)))?;

        for (i, entry) in catalog.tables.iter().enumerate() {
            if catalog.tables[..i].iter().any(|other| other.uri == entry.uri) {
                return Err(StorageError::catalog(format!(
                    "Duplicate table {} in catalog",
                    entry.uri
                )));
            }
        }
        Ok(catalog)
    }

    pub fn save(&self, path: &Path) -> StorageResult<()> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| StorageError::catalog(format!("Failed to encode catalog: {}", e)))?;

        let tmp = path.with_extension("json.tmp");
        let mut file = File::create(&tmp).map_err(|e| {
            StorageError::write_failed(format!("Failed to create {}", tmp.display()), e)
        })?;
        file.write_all(&json)
            .and_then(|_| file.sync_all())
            .map_err(|e| StorageError::write_failed("Failed to write catalog", e))?;
        fs::rename(&tmp, path)
            .map_err(|e| StorageError::write_failed("Failed to replace catalog", e))
    }

    pub fn get(&self, uri: &str) -> Option<&CatalogEntry> {
        self.tables.iter().find(|entry| entry.uri == uri)
    }
}
