//! Commit Authority - commit identity assignment
//!
//! - Commit identities are assigned exactly once, at commit
//! - The ordering is total and strict across all tables
//! - On open, the authority resumes after the highest identity found in the
//!   on-disk base files and the history store
//!
//! The update chains are in memory only, so any identity that never reached
//! a reconciled file is forgotten on restart. Nothing durable refers to it.

use thiserror::Error;

use crate::mvcc::CommitId;

/// Commit authority shared by every table of a database.
#[derive(Debug, Default)]
pub struct CommitAuthority {
    /// The highest commit identity observed during open or assigned since.
    highest_commit_id: u64,
}

impl CommitAuthority {
    /// Create a new commit authority starting from zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a commit authority resuming after `commit_id`.
    pub fn from_highest(commit_id: u64) -> Self {
        Self {
            highest_commit_id: commit_id,
        }
    }

    /// Fold in a commit identity read back from a reconciled file.
    ///
    /// Files hold many records per commit (one per revision) in no
    /// particular order, so observation keeps the maximum.
    pub fn observe(&mut self, commit_id: CommitId) {
        self.highest_commit_id = self.highest_commit_id.max(commit_id.value());
    }

    /// Assign the next commit identity.
    pub fn assign(&mut self) -> Result<CommitId, CommitAuthorityError> {
        let next = self
            .highest_commit_id
            .checked_add(1)
            .ok_or(CommitAuthorityError::Exhausted)?;
        self.highest_commit_id = next;
        Ok(CommitId::new(next))
    }

    /// Get the current highest commit identity.
    pub fn highest_commit_id(&self) -> Option<CommitId> {
        if self.highest_commit_id == 0 {
            None
        } else {
            Some(CommitId::new(self.highest_commit_id))
        }
    }
}

/// Errors from commit authority operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitAuthorityError {
    /// The 64-bit identity space is used up.
    #[error("commit identity space exhausted")]
    Exhausted,
}
