//! Fixed-size block of record slots
//!
//! A block is a `block_size`-byte buffer: a 4-byte LE record-count header
//! followed by contiguous fixed-width record slots. Tombstoned records keep
//! their slot (and stay in the count) until compaction rewrites the block.

use crate::{GraniteError, Record, Result};
use bytes::BytesMut;
use std::fmt;

/// Record-count header size in bytes
pub const BLOCK_HEADER_SIZE: usize = 4;

/// A fixed-capacity container of record slots
#[derive(Debug, Clone)]
pub struct Block {
    data: BytesMut,
}

impl Block {
    /// Create an empty block of `block_size` bytes (record count 0)
    pub fn new(block_size: usize) -> Self {
        let mut data = BytesMut::with_capacity(block_size);
        data.resize(block_size, 0);
        Self { data }
    }

    /// Wrap an existing `block_size`-byte buffer
    pub fn from_bytes(data: &[u8]) -> Self {
        Self {
            data: BytesMut::from(data),
        }
    }

    /// The raw block bytes, always exactly `block_size` long
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Number of record slots that fit after the header
    pub fn max_records(&self) -> usize {
        (self.data.len() - BLOCK_HEADER_SIZE) / Record::SIZE
    }

    /// Populated slot count, tombstoned slots included
    pub fn record_count(&self) -> usize {
        u32::from_le_bytes(self.data[..BLOCK_HEADER_SIZE].try_into().unwrap()) as usize
    }

    fn set_record_count(&mut self, count: usize) {
        self.data[..BLOCK_HEADER_SIZE].copy_from_slice(&(count as u32).to_le_bytes());
    }

    /// Whether every slot is populated
    pub fn is_full(&self) -> bool {
        self.record_count() >= self.max_records()
    }

    fn slot_offset(&self, slot: usize) -> usize {
        BLOCK_HEADER_SIZE + slot * Record::SIZE
    }

    /// Append a record at the next free slot, returning its slot index
    pub fn insert(&mut self, record: &Record) -> Result<usize> {
        let count = self.record_count();
        if count >= self.max_records() {
            return Err(GraniteError::BlockFull {
                capacity: self.max_records(),
            });
        }

        let offset = self.slot_offset(count);
        self.data[offset..offset + Record::SIZE].copy_from_slice(&record.encode());
        self.set_record_count(count + 1);
        Ok(count)
    }

    /// Insert a record at `position`, shifting subsequent slots right by one.
    /// Used by compaction to keep surviving records left-packed.
    pub fn insert_at(&mut self, position: usize, record: &Record) -> Result<()> {
        let count = self.record_count();
        if position > count {
            return Err(GraniteError::InvalidPosition { position, count });
        }
        if count >= self.max_records() {
            return Err(GraniteError::BlockFull {
                capacity: self.max_records(),
            });
        }

        let offset = self.slot_offset(position);
        let end = self.slot_offset(count);
        self.data.copy_within(offset..end, offset + Record::SIZE);
        self.data[offset..offset + Record::SIZE].copy_from_slice(&record.encode());
        self.set_record_count(count + 1);
        Ok(())
    }

    /// Read the record at `slot`
    pub fn record_at(&self, slot: usize) -> Result<Record> {
        let count = self.record_count();
        if slot >= count {
            return Err(GraniteError::InvalidSlot { slot, count });
        }
        let offset = self.slot_offset(slot);
        Record::decode(&self.data[offset..offset + Record::SIZE])
    }

    /// Flip the tombstone flag of the record at `slot` in place. The slot is
    /// rewritten; nothing shifts and the record count is unchanged.
    pub fn tombstone_at(&mut self, slot: usize) -> Result<()> {
        let record = self.record_at(slot)?;
        let offset = self.slot_offset(slot);
        self.data[offset..offset + Record::SIZE].copy_from_slice(&record.tombstoned().encode());
        Ok(())
    }

    /// Linear scan for `uuid` and flip its tombstone flag in place,
    /// returning the slot that was rewritten
    pub fn tombstone_by_uuid(&mut self, uuid: &str) -> Result<usize> {
        let count = self.record_count();
        for slot in 0..count {
            if self.record_at(slot)?.uuid == uuid {
                self.tombstone_at(slot)?;
                return Ok(slot);
            }
        }
        Err(GraniteError::RecordNotFound(uuid.to_string()))
    }

    /// Iterate over populated slots in order
    pub fn records(&self) -> impl Iterator<Item = Record> + '_ {
        (0..self.record_count()).filter_map(|slot| self.record_at(slot).ok())
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for record in self.records() {
            writeln!(f, "{}", record)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(n: i32) -> Record {
        Record::new(format!("tt{:07}", n), n as f32 / 10.0, n)
    }

    #[test]
    fn test_insert_and_read() {
        let mut block = Block::new(200);
        assert_eq!(block.max_records(), 9);
        assert_eq!(block.record_count(), 0);

        let slot = block.insert(&sample(1)).unwrap();
        assert_eq!(slot, 0);
        assert_eq!(block.record_count(), 1);
        assert_eq!(block.record_at(0).unwrap(), sample(1));
    }

    #[test]
    fn test_insert_until_full() {
        let mut block = Block::new(200);
        for i in 0..9 {
            block.insert(&sample(i)).unwrap();
        }
        assert!(block.is_full());

        let result = block.insert(&sample(99));
        assert!(matches!(result, Err(GraniteError::BlockFull { .. })));
        assert_eq!(block.record_count(), 9);
    }

    #[test]
    fn test_insert_at_shifts_right() {
        let mut block = Block::new(200);
        block.insert(&sample(1)).unwrap();
        block.insert(&sample(3)).unwrap();

        block.insert_at(1, &sample(2)).unwrap();
        assert_eq!(block.record_count(), 3);
        assert_eq!(block.record_at(0).unwrap().num_votes, 1);
        assert_eq!(block.record_at(1).unwrap().num_votes, 2);
        assert_eq!(block.record_at(2).unwrap().num_votes, 3);
    }

    #[test]
    fn test_insert_at_invalid_position() {
        let mut block = Block::new(200);
        block.insert(&sample(1)).unwrap();

        let result = block.insert_at(5, &sample(2));
        assert!(matches!(result, Err(GraniteError::InvalidPosition { .. })));
        // The block is untouched after the failed insert
        assert_eq!(block.record_count(), 1);
        assert_eq!(block.record_at(0).unwrap(), sample(1));
    }

    #[test]
    fn test_tombstone_keeps_slot() {
        let mut block = Block::new(200);
        block.insert(&sample(1)).unwrap();
        block.insert(&sample(2)).unwrap();

        let slot = block.tombstone_by_uuid("tt0000001").unwrap();
        assert_eq!(slot, 0);
        assert_eq!(block.record_count(), 2);

        let dead = block.record_at(0).unwrap();
        assert!(dead.tombstone);
        assert_eq!(dead.num_votes, 1);
        assert!(!block.record_at(1).unwrap().tombstone);
    }

    #[test]
    fn test_tombstone_missing_uuid() {
        let mut block = Block::new(200);
        block.insert(&sample(1)).unwrap();
        let result = block.tombstone_by_uuid("tt9999999");
        assert!(matches!(result, Err(GraniteError::RecordNotFound(_))));
    }

    #[test]
    fn test_display_lists_records_in_slot_order() {
        let mut block = Block::new(200);
        block.insert(&sample(1)).unwrap();
        block.insert(&sample(2)).unwrap();

        let text = block.to_string();
        assert_eq!(text.lines().count(), 2);
        assert!(text.lines().next().unwrap().contains("tt0000001"));
    }

    #[test]
    fn test_roundtrip_through_bytes() {
        let mut block = Block::new(200);
        block.insert(&sample(7)).unwrap();
        block.insert(&sample(8)).unwrap();

        let restored = Block::from_bytes(block.as_bytes());
        assert_eq!(restored.record_count(), 2);
        assert_eq!(restored.record_at(1).unwrap(), sample(8));
    }
}
