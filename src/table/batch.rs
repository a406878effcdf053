//! Write batches

use crate::mvcc::{Timestamp, VersionPayload};

/// Writes applied together under one commit id.
///
/// Revisions follow the order operations were added, starting at zero.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    pub(crate) ops: Vec<(Vec<u8>, VersionPayload)>,
    pub(crate) ts: Option<Timestamp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit timestamp for every write in the batch.
    pub fn with_timestamp(mut self, ts: Timestamp) -> Self {
        self.ts = Some(ts);
        self
    }

    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> &mut Self {
        self.ops
            .push((key.into(), VersionPayload::Document(value.into())));
        self
    }

    pub fn remove(&mut self, key: impl Into<Vec<u8>>) -> &mut Self {
        self.ops.push((key.into(), VersionPayload::Tombstone));
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}
