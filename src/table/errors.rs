//! Table error types

use thiserror::Error;

use crate::mvcc::CommitAuthorityError;
use crate::storage::StorageError;

/// Errors from table writes and reconciliation.
#[derive(Debug, Error)]
pub enum TableError {
    /// `update` of a key with no live value.
    #[error("key not found")]
    KeyNotFound,

    #[error(transparent)]
    CommitIds(#[from] CommitAuthorityError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl TableError {
    /// Stable error code string.
    pub fn code(&self) -> &'static str {
        match self {
            TableError::KeyNotFound => "STRATA_TABLE_KEY_NOT_FOUND",
            TableError::CommitIds(_) => "STRATA_TABLE_COMMIT_IDS_EXHAUSTED",
            TableError::Storage(err) => err.code().code(),
        }
    }
}

/// Result type for table operations
pub type TableResult<T> = Result<T, TableError>;
