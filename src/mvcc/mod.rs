//! MVCC Domain Types
//!
//! This module provides:
//! - `CommitId` - Totally ordered commit identity
//! - `CommitAuthority` - Commit identity assignment
//! - `VersionPayload` - Value or explicit tombstone
//! - `VersionKind` / `VersionMetadata` - What the version cursor reports
//!   about each version, plus its fixed-width encoding

mod commit_authority;
mod commit_id;
mod version;

pub use commit_authority::{CommitAuthority, CommitAuthorityError};
pub use commit_id::CommitId;
pub use version::{
    MetadataDecodeError, Timestamp, VersionKind, VersionMetadata, VersionPayload, KEY_FORMAT,
    METADATA_ENCODED_LEN, TS_MAX,
};
