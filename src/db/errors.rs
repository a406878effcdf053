//! Database error types

use thiserror::Error;

use crate::config::ConfigError;
use crate::cursor::CursorError;
use crate::storage::StorageError;
use crate::table::TableError;

/// Errors from database operations.
#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Cursor(#[from] CursorError),

    /// URI is not of the form `table:<name>`.
    #[error("invalid table URI {0:?}")]
    InvalidUri(String),

    #[error("table {0} already exists")]
    TableExists(String),

    #[error("table {0} not found")]
    TableNotFound(String),

    #[error("database closed")]
    Closed,
}

impl DbError {
    /// Stable error code string.
    pub fn code(&self) -> &'static str {
        match self {
            DbError::Config(_) => "STRATA_CONFIG_INVALID",
            DbError::Storage(err) => err.code().code(),
            DbError::Table(err) => err.code(),
            DbError::Cursor(err) => err.code(),
            DbError::InvalidUri(_) => "STRATA_DB_INVALID_URI",
            DbError::TableExists(_) => "STRATA_DB_TABLE_EXISTS",
            DbError::TableNotFound(_) => "STRATA_DB_TABLE_NOT_FOUND",
            DbError::Closed => "STRATA_DB_CLOSED",
        }
    }

    /// Whether the data files can no longer be trusted.
    pub fn is_fatal(&self) -> bool {
        match self {
            DbError::Storage(err) => err.is_fatal(),
            DbError::Table(TableError::Storage(err)) => err.is_fatal(),
            DbError::Cursor(CursorError::Storage(err)) => err.is_fatal(),
            _ => false,
        }
    }
}

/// Result type for database operations
pub type DbResult<T> = Result<T, DbError>;
