//! Core types for Granite

use crate::{GraniteError, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

/// A single fixed-width row: a title identifier, its average rating and the
/// number of votes it received. The tombstone flag marks a logically deleted
/// record that still occupies its slot until compaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Title identifier, truncated / NUL-padded to [`Record::UUID_SIZE`]
    /// bytes on encode
    pub uuid: String,
    /// Average rating
    pub rating: f32,
    /// Vote count - the index key
    pub num_votes: i32,
    /// Logical deletion marker
    pub tombstone: bool,
}

impl Record {
    /// Encoded size in bytes, constant for every record
    pub const SIZE: usize = 20;

    /// Encoded uuid width in bytes
    pub const UUID_SIZE: usize = 10;

    /// Create a live record
    pub fn new(uuid: impl Into<String>, rating: f32, num_votes: i32) -> Self {
        Self {
            uuid: uuid.into(),
            rating,
            num_votes,
            tombstone: false,
        }
    }

    /// Return a tombstone-flagged copy carrying the same key and payload
    pub fn tombstoned(&self) -> Self {
        Self {
            tombstone: true,
            ..self.clone()
        }
    }

    /// Serialize to the fixed 20-byte layout
    ///
    /// Format:
    /// - 10 bytes: uuid, NUL-padded
    /// - 1 byte: tombstone flag
    /// - 1 byte: reserved
    /// - 4 bytes: rating, f32 LE
    /// - 4 bytes: num_votes, i32 LE
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::SIZE);

        let mut uuid_bytes = [0u8; Self::UUID_SIZE];
        let raw = self.uuid.as_bytes();
        let n = raw.len().min(Self::UUID_SIZE);
        uuid_bytes[..n].copy_from_slice(&raw[..n]);
        buf.put_slice(&uuid_bytes);

        buf.put_u8(self.tombstone as u8);
        buf.put_u8(0);
        buf.put_f32_le(self.rating);
        buf.put_i32_le(self.num_votes);

        buf.freeze()
    }

    /// Deserialize from the fixed 20-byte layout
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(GraniteError::InvalidFormat(format!(
                "Record too short: {} bytes, expected {}",
                data.len(),
                Self::SIZE
            )));
        }

        let mut cursor = std::io::Cursor::new(data);

        let mut uuid_bytes = [0u8; Self::UUID_SIZE];
        cursor.copy_to_slice(&mut uuid_bytes);
        let end = uuid_bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(Self::UUID_SIZE);
        let uuid = String::from_utf8(uuid_bytes[..end].to_vec())
            .map_err(|e| GraniteError::InvalidFormat(e.to_string()))?;

        let tombstone = cursor.get_u8() != 0;
        cursor.get_u8(); // reserved
        let rating = cursor.get_f32_le();
        let num_votes = cursor.get_i32_le();

        Ok(Self {
            uuid,
            rating,
            num_votes,
            tombstone,
        })
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ uuid:'{}', rating:{:.1}, num_votes:{}{} }}",
            self.uuid,
            self.rating,
            self.num_votes,
            if self.tombstone { ", tombstone" } else { "" }
        )
    }
}

/// Physical address of a record slot: 1-indexed block number plus slot
/// offset within the block. A weak reference from the index into storage -
/// it never owns the data it points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowAddress {
    /// Block number, 1-indexed
    pub block: usize,
    /// Slot offset within the block
    pub slot: usize,
}

impl RowAddress {
    /// Create a new address
    pub fn new(block: usize, slot: usize) -> Self {
        Self { block, slot }
    }
}

impl fmt::Display for RowAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(block {}, slot {})", self.block, self.slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_roundtrip() {
        let record = Record::new("tt0000123", 7.4, 1523);
        let encoded = record.encode();
        assert_eq!(encoded.len(), Record::SIZE);

        let decoded = Record::decode(&encoded).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_tombstone_roundtrip() {
        let record = Record::new("tt0000042", 3.2, 42).tombstoned();
        let decoded = Record::decode(&record.encode()).unwrap();
        assert!(decoded.tombstone);
        assert_eq!(decoded.num_votes, 42);
        assert_eq!(decoded.uuid, "tt0000042");
    }

    #[test]
    fn test_uuid_truncated_to_fixed_width() {
        let record = Record::new("tt12345678901234", 5.0, 1);
        let decoded = Record::decode(&record.encode()).unwrap();
        assert_eq!(decoded.uuid, "tt12345678");
    }

    #[test]
    fn test_decode_too_short() {
        let result = Record::decode(&[0u8; 7]);
        assert!(matches!(result, Err(GraniteError::InvalidFormat(_))));
    }
}
