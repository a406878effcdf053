//! Stored version record
//!
//! Both the per-table base files and the history store hold the same record:
//!
//! ```text
//! +------------------+
//! | Record Length    | (u32 LE)
//! +------------------+
//! | Table URI        | (length-prefixed string)
//! +------------------+
//! | Key              | (length-prefixed bytes)
//! +------------------+
//! | Commit ID        | (u64 LE)
//! | Revision         | (u64 LE)
//! | Start TS         | (u64 LE)
//! | Durable TS       | (u64 LE)
//! | Stop TS          | (u64 LE)
//! +------------------+
//! | Flags            | (u8: bit0 has start, bit1 has stop, bit2 tombstone)
//! +------------------+
//! | Value            | (length-prefixed bytes)
//! +------------------+
//! | Checksum         | (u32 LE)
//! +------------------+
//! ```
//!
//! Checksum covers all bytes except the checksum itself.

use std::io::{self, Read};

use crate::mvcc::{CommitId, Timestamp, VersionKind, VersionMetadata, TS_MAX};

use super::{StorageError, StorageResult};

const FLAG_HAS_START: u8 = 0b001;
const FLAG_HAS_STOP: u8 = 0b010;
const FLAG_TOMBSTONE: u8 = 0b100;

/// len + uri + key + 5 words + flags + value + checksum
pub(crate) const MIN_RECORD_SIZE: usize = 4 + 4 + 4 + 5 * 8 + 1 + 4 + 4;

/// One reconciled version of a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredVersion {
    /// URI of the owning table
    pub uri: String,
    /// User key
    pub key: Vec<u8>,
    /// Commit that wrote this version
    pub commit_id: CommitId,
    /// Position of the write within its commit
    pub revision: u64,
    /// Start of the visibility window
    pub start_ts: Option<Timestamp>,
    /// Durable timestamp of the commit
    pub durable_ts: Timestamp,
    /// End of the visibility window, set when a newer version exists
    pub stop_ts: Option<Timestamp>,
    /// Whether this records a removal (base files only)
    pub is_tombstone: bool,
    /// Value bytes (empty for tombstones)
    pub value: Vec<u8>,
}

impl StoredVersion {
    /// Metadata reported for this record when emitted as `kind`.
    pub fn metadata(&self, kind: VersionKind) -> VersionMetadata {
        VersionMetadata {
            start_ts: self.start_ts,
            stop_ts: self.stop_ts,
            commit_id: self.commit_id,
            revision: self.revision,
            durable_ts: self.durable_ts,
            kind,
        }
    }

    fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.start_ts.is_some() {
            flags |= FLAG_HAS_START;
        }
        if self.stop_ts.is_some() {
            flags |= FLAG_HAS_STOP;
        }
        if self.is_tombstone {
            flags |= FLAG_TOMBSTONE;
        }
        flags
    }

    fn serialize_body(&self) -> StorageResult<Vec<u8>> {
        let uri_len = encoded_len("uri", self.uri.len())?;
        let key_len = encoded_len("key", self.key.len())?;
        let value_len = encoded_len("value", self.value.len())?;

        let capacity = MIN_RECORD_SIZE + self.uri.len() + self.key.len() + self.value.len();
        let mut buf = Vec::with_capacity(capacity);

        buf.extend_from_slice(&uri_len.to_le_bytes());
        buf.extend_from_slice(self.uri.as_bytes());

        buf.extend_from_slice(&key_len.to_le_bytes());
        buf.extend_from_slice(&self.key);

        buf.extend_from_slice(&self.commit_id.value().to_le_bytes());
        buf.extend_from_slice(&self.revision.to_le_bytes());
        buf.extend_from_slice(&self.start_ts.unwrap_or(0).to_le_bytes());
        buf.extend_from_slice(&self.durable_ts.to_le_bytes());
        buf.extend_from_slice(&self.stop_ts.unwrap_or(TS_MAX).to_le_bytes());

        buf.push(self.flags());

        buf.extend_from_slice(&value_len.to_le_bytes());
        buf.extend_from_slice(&self.value);

        Ok(buf)
    }

    /// Serialize the complete record to bytes.
    ///
    /// Fails if any field, or the whole record, does not fit a u32 length.
    pub fn serialize(&self) -> StorageResult<Vec<u8>> {
        let body = self.serialize_body()?;
        let record_length = encoded_len("record", 4 + body.len() + 4)?;

        let mut record = Vec::with_capacity(record_length as usize);
        record.extend_from_slice(&record_length.to_le_bytes());
        record.extend_from_slice(&body);
        let checksum = super::checksum::compute_checksum(&record);
        record.extend_from_slice(&checksum.to_le_bytes());

        Ok(record)
    }

    /// Deserialize a record from bytes, verifying checksum.
    ///
    /// Returns the record and the number of bytes consumed.
    pub fn deserialize(data: &[u8]) -> io::Result<(Self, usize)> {
        if data.len() < MIN_RECORD_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Record too short",
            ));
        }

        let record_length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;

        if record_length < MIN_RECORD_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid record length: {}", record_length),
            ));
        }

        if data.len() < record_length {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "Record truncated: expected {} bytes, got {}",
                    record_length,
                    data.len()
                ),
            ));
        }

        let checksum_offset = record_length - 4;
        let stored_checksum = u32::from_le_bytes([
            data[checksum_offset],
            data[checksum_offset + 1],
            data[checksum_offset + 2],
            data[checksum_offset + 3],
        ]);

        if !super::checksum::verify_checksum(&data[0..checksum_offset], stored_checksum) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Checksum mismatch: stored {:08x}",
                    stored_checksum
                ),
            ));
        }

        let mut cursor = io::Cursor::new(&data[4..checksum_offset]);

        fn read_bytes<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
            let mut len_buf = [0u8; 4];
            reader.read_exact(&mut len_buf)?;
            let len = u32::from_le_bytes(len_buf) as usize;

            let mut buf = vec![0u8; len];
            reader.read_exact(&mut buf)?;
            Ok(buf)
        }

        fn read_u64<R: Read>(reader: &mut R) -> io::Result<u64> {
            let mut buf = [0u8; 8];
            reader.read_exact(&mut buf)?;
            Ok(u64::from_le_bytes(buf))
        }

        let uri = String::from_utf8(read_bytes(&mut cursor)?).map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("Invalid UTF-8: {}", e))
        })?;
        let key = read_bytes(&mut cursor)?;
        let commit_id = CommitId::new(read_u64(&mut cursor)?);
        let revision = read_u64(&mut cursor)?;
        let start_ts = read_u64(&mut cursor)?;
        let durable_ts = read_u64(&mut cursor)?;
        let stop_ts = read_u64(&mut cursor)?;

        let mut flags = [0u8; 1];
        cursor.read_exact(&mut flags)?;
        let flags = flags[0];
        if flags & !(FLAG_HAS_START | FLAG_HAS_STOP | FLAG_TOMBSTONE) != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unknown record flags: {:#04x}", flags),
            ));
        }

        let value = read_bytes(&mut cursor)?;

        Ok((
            Self {
                uri,
                key,
                commit_id,
                revision,
                start_ts: (flags & FLAG_HAS_START != 0).then_some(start_ts),
                durable_ts,
                stop_ts: (flags & FLAG_HAS_STOP != 0).then_some(stop_ts),
                is_tombstone: flags & FLAG_TOMBSTONE != 0,
                value,
            },
            record_length,
        ))
    }
}

/// Length prefix for a field of `len` bytes.
fn encoded_len(field: &str, len: usize) -> StorageResult<u32> {
    u32::try_from(len).map_err(|_| {
        StorageError::write_failed_no_source(format!(
            "{} of {} bytes exceeds the record length limit",
            field, len
        ))
    })
}
