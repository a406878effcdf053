//! CommitId - Totally ordered commit identity
//!
//! Every committed write carries a commit identity. Commit identities:
//! - Totally order all commits across every table
//! - Survive reconciliation into the on-disk base and the history store
//! - Are the ordering token the version cursor reports newest-first
//!
//! This is a PURE TYPE with NO behavior beyond construction and access.

use serde::{Deserialize, Serialize};

/// A totally ordered, opaque commit identity.
///
/// Writes in the same batch share a commit identity and are told apart by
/// their revision counter.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct CommitId(u64);

impl CommitId {
    /// Creates a new CommitId with the given value.
    ///
    /// No Default implementation exists to prevent accidental construction.
    #[inline]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the underlying value.
    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for CommitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
