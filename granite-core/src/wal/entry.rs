//! WAL entry types and serialization

use crate::{GraniteError, Record, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Logged mutation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LogOperation {
    /// A record was inserted
    Insert = 0,
    /// A record was logically deleted (tombstone written)
    Delete = 1,
}

impl TryFrom<u8> for LogOperation {
    type Error = GraniteError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(LogOperation::Insert),
            1 => Ok(LogOperation::Delete),
            _ => Err(GraniteError::InvalidFormat(format!(
                "Invalid WAL operation: {}",
                value
            ))),
        }
    }
}

/// A single WAL entry: an operation tag plus the full record it applies to.
/// Entries are fixed-width, so the log is a flat array of them and a torn
/// trailing write is simply a short tail.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// What happened
    pub operation: LogOperation,
    /// The record the operation carries
    pub record: Record,
}

impl LogEntry {
    /// Encoded size in bytes, constant for every entry
    pub const SIZE: usize = 1 + Record::SIZE;

    /// Create an insert entry
    pub fn insert(record: Record) -> Self {
        Self {
            operation: LogOperation::Insert,
            record,
        }
    }

    /// Create a delete entry
    pub fn delete(record: Record) -> Self {
        Self {
            operation: LogOperation::Delete,
            record,
        }
    }

    /// Serialize to the fixed layout
    ///
    /// Format:
    /// - 1 byte: operation tag
    /// - 20 bytes: the record
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        buf.put_u8(self.operation as u8);
        buf.put_slice(&self.record.encode());
        buf.freeze()
    }

    /// Deserialize from the fixed layout
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(GraniteError::InvalidFormat(format!(
                "WAL entry too short: {} bytes, expected {}",
                data.len(),
                Self::SIZE
            )));
        }
        let mut cursor = std::io::Cursor::new(data);
        let operation = LogOperation::try_from(cursor.get_u8())?;
        let record = Record::decode(&data[1..Self::SIZE])?;
        Ok(Self { operation, record })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_roundtrip() {
        let entry = LogEntry::insert(Record::new("tt0000123", 7.4, 1523));
        let encoded = entry.encode();
        assert_eq!(encoded.len(), LogEntry::SIZE);

        let decoded = LogEntry::decode(&encoded).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn test_delete_entry_carries_tombstone() {
        let entry = LogEntry::delete(Record::new("tt0000042", 3.2, 42).tombstoned());
        let decoded = LogEntry::decode(&entry.encode()).unwrap();
        assert_eq!(decoded.operation, LogOperation::Delete);
        assert!(decoded.record.tombstone);
    }

    #[test]
    fn test_invalid_operation_tag() {
        let mut data = LogEntry::insert(Record::new("tt1", 1.0, 1)).encode().to_vec();
        data[0] = 9;
        assert!(matches!(
            LogEntry::decode(&data),
            Err(GraniteError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_torn_entry_too_short() {
        let data = LogEntry::insert(Record::new("tt1", 1.0, 1)).encode();
        assert!(LogEntry::decode(&data[..LogEntry::SIZE - 3]).is_err());
    }
}
