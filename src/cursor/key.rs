//! Version keys and emitted records

use serde::Serialize;

use crate::mvcc::{VersionMetadata, METADATA_ENCODED_LEN};

use super::{CursorError, CursorResult};

/// Key reported by the version cursor: the caller's key plus the metadata
/// of the version currently emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionKey {
    pub user_key: Vec<u8>,
    pub metadata: VersionMetadata,
}

impl VersionKey {
    /// User key followed by the fixed-width metadata encoding.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.user_key.len() + METADATA_ENCODED_LEN);
        out.extend_from_slice(&self.user_key);
        out.extend_from_slice(&self.metadata.encode());
        out
    }

    /// Inverse of [`VersionKey::to_bytes`]; the trailing bytes are the
    /// metadata.
    pub fn from_bytes(bytes: &[u8]) -> CursorResult<Self> {
        let split = bytes.len().checked_sub(METADATA_ENCODED_LEN).ok_or_else(|| {
            CursorError::Encoding(format!(
                "{} bytes is shorter than the metadata",
                bytes.len()
            ))
        })?;
        let metadata = VersionMetadata::decode(&bytes[split..])
            .map_err(|e| CursorError::Encoding(e.to_string()))?;
        Ok(Self {
            user_key: bytes[..split].to_vec(),
            metadata,
        })
    }
}

/// One version emitted by a `next` step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRecord {
    pub user_key: Vec<u8>,
    pub metadata: VersionMetadata,
    /// Empty for tombstones
    pub value: Vec<u8>,
}

impl VersionRecord {
    pub fn key(&self) -> VersionKey {
        VersionKey {
            user_key: self.user_key.clone(),
            metadata: self.metadata,
        }
    }
}
