//! Cursor error types
//!
//! Error codes:
//! - STRATA_CURSOR_NOT_FOUND
//! - STRATA_CURSOR_INVALID_STATE
//! - STRATA_CURSOR_NOT_SUPPORTED
//! - STRATA_CURSOR_STALE_CHAIN
//! - STRATA_CURSOR_ENCODING
//! - storage errors keep their own STRATA_* code

use thiserror::Error;

use crate::storage::StorageError;

/// Errors reported by cursors.
#[derive(Debug, Error)]
pub enum CursorError {
    /// No record matches the key, or the traversal is exhausted.
    #[error("not found")]
    NotFound,

    /// The operation is not valid in the cursor's current state.
    #[error("invalid cursor state: {0}")]
    InvalidState(&'static str),

    /// The operation is not provided by this cursor.
    #[error("operation not supported: {0}")]
    NotSupported(&'static str),

    /// A chain handle outlived the node it referred to.
    #[error("update chain changed under the cursor")]
    StaleChain,

    /// Failure in the underlying storage.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Malformed version key bytes.
    #[error("malformed version key: {0}")]
    Encoding(String),
}

impl CursorError {
    /// Stable error code string.
    pub fn code(&self) -> &'static str {
        match self {
            CursorError::NotFound => "STRATA_CURSOR_NOT_FOUND",
            CursorError::InvalidState(_) => "STRATA_CURSOR_INVALID_STATE",
            CursorError::NotSupported(_) => "STRATA_CURSOR_NOT_SUPPORTED",
            CursorError::StaleChain => "STRATA_CURSOR_STALE_CHAIN",
            CursorError::Storage(err) => err.code().code(),
            CursorError::Encoding(_) => "STRATA_CURSOR_ENCODING",
        }
    }

    /// Whether this is the `NotFound` outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CursorError::NotFound)
    }
}

/// Result type for cursor operations
pub type CursorResult<T> = Result<T, CursorError>;
