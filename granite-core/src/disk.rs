//! Simulated disk: a preallocated byte arena of fixed-size blocks
//!
//! Blocks are addressed by 1-indexed block number and exchanged whole.
//! Reading a block that was never written returns a zeroed block, which
//! decodes as an empty block (record count 0).

use crate::block::Block;
use crate::{GraniteError, Result};

/// Fixed-capacity in-memory block arena
pub struct Disk {
    bytes: Vec<u8>,
    block_size: usize,
}

impl Disk {
    /// Allocate an arena of `capacity` bytes carved into `block_size` blocks
    pub fn new(block_size: usize, capacity: usize) -> Result<Self> {
        if block_size == 0 || capacity < block_size {
            return Err(GraniteError::Config(format!(
                "disk capacity {} cannot hold a single {}-byte block",
                capacity, block_size
            )));
        }
        Ok(Self {
            bytes: vec![0u8; capacity],
            block_size,
        })
    }

    /// Block size in bytes
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Total arena capacity in bytes
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Number of blocks the arena can hold
    pub fn max_blocks(&self) -> usize {
        self.bytes.len() / self.block_size
    }

    fn offset(&self, block_number: usize) -> Result<usize> {
        if block_number == 0 || block_number > self.max_blocks() {
            return Err(GraniteError::DiskFull {
                block: block_number,
                max_blocks: self.max_blocks(),
            });
        }
        Ok((block_number - 1) * self.block_size)
    }

    /// Read the block at the 1-indexed `block_number`
    pub fn read_block(&self, block_number: usize) -> Result<Block> {
        let offset = self.offset(block_number)?;
        Ok(Block::from_bytes(&self.bytes[offset..offset + self.block_size]))
    }

    /// Write a whole block at the 1-indexed `block_number`
    pub fn write_block(&mut self, block_number: usize, block: &Block) -> Result<()> {
        let offset = self.offset(block_number)?;
        self.bytes[offset..offset + self.block_size].copy_from_slice(block.as_bytes());
        Ok(())
    }

    /// Zero the block at `block_number` (used when compaction truncates
    /// trailing blocks)
    pub fn clear_block(&mut self, block_number: usize) -> Result<()> {
        let offset = self.offset(block_number)?;
        self.bytes[offset..offset + self.block_size].fill(0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Record;

    #[test]
    fn test_unwritten_block_is_empty() {
        let disk = Disk::new(200, 2000).unwrap();
        assert_eq!(disk.max_blocks(), 10);

        let block = disk.read_block(5).unwrap();
        assert_eq!(block.record_count(), 0);
    }

    #[test]
    fn test_write_then_read() {
        let mut disk = Disk::new(200, 2000).unwrap();
        let mut block = disk.read_block(1).unwrap();
        block.insert(&Record::new("tt0000001", 6.5, 100)).unwrap();
        disk.write_block(1, &block).unwrap();

        let read_back = disk.read_block(1).unwrap();
        assert_eq!(read_back.record_count(), 1);
        assert_eq!(read_back.record_at(0).unwrap().num_votes, 100);

        // Neighbouring block untouched
        assert_eq!(disk.read_block(2).unwrap().record_count(), 0);
    }

    #[test]
    fn test_block_numbers_are_one_indexed() {
        let disk = Disk::new(200, 2000).unwrap();
        assert!(matches!(
            disk.read_block(0),
            Err(GraniteError::DiskFull { .. })
        ));
        assert!(disk.read_block(10).is_ok());
        assert!(matches!(
            disk.read_block(11),
            Err(GraniteError::DiskFull { .. })
        ));
    }

    #[test]
    fn test_clear_block() {
        let mut disk = Disk::new(200, 400).unwrap();
        let mut block = disk.read_block(2).unwrap();
        block.insert(&Record::new("tt0000009", 1.0, 9)).unwrap();
        disk.write_block(2, &block).unwrap();

        disk.clear_block(2).unwrap();
        assert_eq!(disk.read_block(2).unwrap().record_count(), 0);
    }
}
