//! Version payloads and version metadata
//!
//! A version is one historical value of a key. Whatever layer it comes from
//! (update chain, on-disk base, history store), the version cursor reports
//! it with the same metadata tuple:
//!
//! ```text
//! +------------------+
//! | start timestamp  | (u64 BE, 0 when the write was untimestamped)
//! | stop timestamp   | (u64 BE, u64::MAX while no newer version exists)
//! | commit id        | (u64 BE)
//! | revision         | (u64 BE)
//! | durable ts       | (u64 BE)
//! | has start        | (u8)
//! | has stop         | (u8)
//! | kind             | (u8)
//! +------------------+
//! ```
//!
//! Big-endian fixed-width fields keep encoded metadata byte-comparable.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::CommitId;

/// Timestamps are opaque 64-bit values supplied by the writer.
pub type Timestamp = u64;

/// Stop marker value of a version that has not been superseded.
pub const TS_MAX: Timestamp = u64::MAX;

/// Format string of the encoded metadata: five u64 then three u8.
pub const KEY_FORMAT: &str = "QQQQQBBB";

/// Length in bytes of encoded metadata.
pub const METADATA_ENCODED_LEN: usize = 5 * 8 + 3;

/// The payload of a version: either a value or an explicit tombstone.
///
/// Tombstone is explicit, NOT represented via Option.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VersionPayload {
    /// A complete value.
    Document(Vec<u8>),
    /// An explicit deletion marker.
    Tombstone,
}

impl VersionPayload {
    /// Returns true if this payload is a tombstone.
    #[inline]
    pub fn is_tombstone(&self) -> bool {
        matches!(self, VersionPayload::Tombstone)
    }

    /// Returns the value bytes; empty for a tombstone.
    pub fn bytes(&self) -> &[u8] {
        match self {
            VersionPayload::Document(data) => data,
            VersionPayload::Tombstone => &[],
        }
    }
}

/// Which layer a reported version came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum VersionKind {
    /// A value on the in-memory update chain.
    Update = 0,
    /// A removal on the in-memory update chain.
    Tombstone = 1,
    /// The reconciled base value.
    OnDisk = 2,
    /// A value evicted to the history store.
    History = 3,
}

impl VersionKind {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionKind::Update => "update",
            VersionKind::Tombstone => "tombstone",
            VersionKind::OnDisk => "on_disk",
            VersionKind::History => "history",
        }
    }

    fn from_u8(byte: u8) -> Result<Self, MetadataDecodeError> {
        match byte {
            0 => Ok(VersionKind::Update),
            1 => Ok(VersionKind::Tombstone),
            2 => Ok(VersionKind::OnDisk),
            3 => Ok(VersionKind::History),
            other => Err(MetadataDecodeError::UnknownKind(other)),
        }
    }
}

/// Provenance and recency of one reported version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMetadata {
    /// Start of the visibility window; None for untimestamped writes.
    pub start_ts: Option<Timestamp>,
    /// End of the visibility window; None while no newer version exists.
    pub stop_ts: Option<Timestamp>,
    /// Global commit order.
    pub commit_id: CommitId,
    /// Position of the write within its commit.
    pub revision: u64,
    /// Durable timestamp of the commit.
    pub durable_ts: Timestamp,
    /// Layer the version came from.
    pub kind: VersionKind,
}

impl VersionMetadata {
    /// Encode into the fixed-width layout described in the module docs.
    pub fn encode(&self) -> [u8; METADATA_ENCODED_LEN] {
        let mut out = [0u8; METADATA_ENCODED_LEN];
        let fields = [
            self.start_ts.unwrap_or(0),
            self.stop_ts.unwrap_or(TS_MAX),
            self.commit_id.value(),
            self.revision,
            self.durable_ts,
        ];
        for (i, field) in fields.iter().enumerate() {
            out[i * 8..(i + 1) * 8].copy_from_slice(&field.to_be_bytes());
        }
        out[40] = self.start_ts.is_some() as u8;
        out[41] = self.stop_ts.is_some() as u8;
        out[42] = self.kind as u8;
        out
    }

    /// Decode from exactly [`METADATA_ENCODED_LEN`] bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, MetadataDecodeError> {
        if bytes.len() != METADATA_ENCODED_LEN {
            return Err(MetadataDecodeError::Length(bytes.len()));
        }
        let word = |i: usize| {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&bytes[i * 8..(i + 1) * 8]);
            u64::from_be_bytes(buf)
        };
        let flag = |i: usize| match bytes[i] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(MetadataDecodeError::InvalidFlag(other)),
        };

        Ok(Self {
            start_ts: flag(40)?.then(|| word(0)),
            stop_ts: flag(41)?.then(|| word(1)),
            commit_id: CommitId::new(word(2)),
            revision: word(3),
            durable_ts: word(4),
            kind: VersionKind::from_u8(bytes[42])?,
        })
    }
}

/// Malformed encoded metadata.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataDecodeError {
    #[error("metadata must be 43 bytes, got {0}")]
    Length(usize),

    #[error("invalid flag byte {0}")]
    InvalidFlag(u8),

    #[error("unknown version kind {0}")]
    UnknownKind(u8),
}
