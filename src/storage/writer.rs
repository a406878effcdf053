//! Append-only record writer
//!
//! Records are only ever appended. A base file may hold several records for
//! the same key; the latest one wins when the file is loaded.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::errors::{StorageError, StorageResult};
use super::record::StoredVersion;

/// Append-only writer over one record file.
pub struct StorageWriter {
    /// Path to the record file
    path: PathBuf,
    /// Underlying file handle
    file: File,
    /// Current file offset
    current_offset: u64,
    /// fsync after every append
    sync_writes: bool,
}

impl StorageWriter {
    /// Opens or creates the record file at `path`, creating parent
    /// directories if needed.
    pub fn open(path: &Path, sync_writes: bool) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    StorageError::write_failed(
                        format!("Failed to create directory: {}", parent.display()),
                        e,
                    )
                })?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                StorageError::write_failed(
                    format!("Failed to open record file: {}", path.display()),
                    e,
                )
            })?;

        let current_offset = file
            .metadata()
            .map_err(|e| StorageError::write_failed("Failed to read file metadata", e))?
            .len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            current_offset,
            sync_writes,
        })
    }

    /// Returns the path to the record file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current file offset.
    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// Appends a record, returning the byte offset it was written at.
    pub fn append(&mut self, record: &StoredVersion) -> StorageResult<u64> {
        let serialized = record.serialize()?;
        let offset = self.current_offset;

        self.file.write_all(&serialized).map_err(|e| {
            StorageError::write_failed(
                format!("Failed to append record to {}", self.path.display()),
                e,
            )
        })?;

        if self.sync_writes {
            self.file.sync_all().map_err(|e| {
                StorageError::write_failed(
                    format!("fsync failed on {}", self.path.display()),
                    e,
                )
            })?;
        }

        self.current_offset += serialized.len() as u64;
        Ok(offset)
    }

    /// Appends several records, syncing once at the end.
    pub fn append_all(&mut self, records: &[StoredVersion]) -> StorageResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let sync = std::mem::replace(&mut self.sync_writes, false);
        let result = records.iter().try_for_each(|r| self.append(r).map(|_| ()));
        self.sync_writes = sync;
        result?;

        if self.sync_writes {
            self.file.sync_all().map_err(|e| {
                StorageError::write_failed(
                    format!("fsync failed on {}", self.path.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }
}
