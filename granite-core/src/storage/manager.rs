//! Storage manager - top-level coordinator
//!
//! Owns the disk arena, the B+ tree index and the write-ahead log, and keeps
//! the three consistent: every mutation is logged first, then applied to the
//! block it lands in, then reflected in the index. Deletes are append-only -
//! a tombstone copy of the record is written through the normal insert path
//! and both copies stay on disk until compaction rewrites the blocks.

use super::StorageConfig;
use crate::block::Block;
use crate::disk::Disk;
use crate::index::BPlusTree;
use crate::wal::{LogOperation, WriteAheadLog};
use crate::{Record, Result, RowAddress};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info};

/// Storage manager over one disk arena
pub struct StorageManager {
    config: StorageConfig,
    disk: Disk,
    index: BPlusTree,
    wal: WriteAheadLog,
    /// Count of allocated blocks; grows monotonically between compactions
    occupied_blocks: usize,
    /// Physical record count, tombstone copies included until compaction
    num_records: usize,
}

/// Result of an index-assisted or linear retrieval, carrying the access
/// statistics the two paths are compared on
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// The live records that matched
    pub records: Vec<Record>,
    /// Distinct blocks touched to answer the query
    pub blocks_accessed: usize,
    /// Mean rating of the matched records, 0.0 when nothing matched
    pub avg_rating: f32,
}

impl QueryResult {
    fn new(records: Vec<Record>, blocks_accessed: usize) -> Self {
        let avg_rating = if records.is_empty() {
            0.0
        } else {
            records.iter().map(|r| r.rating).sum::<f32>() / records.len() as f32
        };
        Self {
            records,
            blocks_accessed,
            avg_rating,
        }
    }
}

/// Snapshot of the manager's counters for reporting
#[derive(Debug, Clone)]
pub struct StorageState {
    pub num_records: usize,
    pub record_size: usize,
    pub max_records_per_block: usize,
    pub occupied_blocks: usize,
    pub disk_utilization: f64,
    pub index_height: usize,
    pub index_nodes: usize,
    pub index_entries: usize,
}

impl fmt::Display for StorageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Number of records: {}", self.num_records)?;
        writeln!(f, "Size of record in bytes: {}", self.record_size)?;
        writeln!(
            f,
            "Max number of records in a block: {}",
            self.max_records_per_block
        )?;
        writeln!(f, "Occupied blocks: {}", self.occupied_blocks)?;
        writeln!(f, "Disk utilization: {:.2} %", self.disk_utilization * 100.0)?;
        write!(
            f,
            "Index: height {}, {} nodes, {} entries",
            self.index_height, self.index_nodes, self.index_entries
        )
    }
}

impl StorageManager {
    /// Open a storage manager: allocate the disk arena, size the index for
    /// the block geometry and open (or create) the write-ahead log
    pub fn open(config: StorageConfig) -> Result<Self> {
        let disk = Disk::new(config.block_size, config.disk_capacity)?;
        let index = BPlusTree::for_block_size(config.block_size);
        let wal = WriteAheadLog::open(&config.wal_path)?;

        info!(
            block_size = config.block_size,
            capacity = config.disk_capacity,
            max_blocks = disk.max_blocks(),
            index_fanout = index.max_keys(),
            "opened storage manager"
        );

        Ok(Self {
            config,
            disk,
            index,
            wal,
            occupied_blocks: 0,
            num_records: 0,
        })
    }

    /// Insert one record: log it, append it to the last block (allocating a
    /// new one when full), index it, then re-evaluate the compaction trigger
    pub fn insert_record(&mut self, record: &Record) -> Result<RowAddress> {
        self.wal.append(LogOperation::Insert, record)?;
        let addr = self.apply_insert(record)?;
        self.maybe_compact()?;
        Ok(addr)
    }

    /// Delete one record: log the intent, supersede it with a tombstone
    /// copy through the normal append path, and drop its key from the index
    pub fn delete_record(&mut self, record: &Record) -> Result<()> {
        self.wal.append(LogOperation::Delete, record)?;
        self.apply_delete(record)?;
        self.maybe_compact()
    }

    /// Delete every live record with `num_votes == key`, returning how many
    /// were deleted. An absent key is a no-op.
    pub fn delete_by_num_votes(&mut self, key: i32) -> Result<usize> {
        let addresses = self.index.find(key);
        if addresses.is_empty() {
            return Ok(0);
        }

        let mut victims = Vec::with_capacity(addresses.len());
        for addr in addresses {
            let record = self.disk.read_block(addr.block)?.record_at(addr.slot)?;
            if !record.tombstone {
                victims.push(record);
            }
        }

        for record in &victims {
            self.delete_record(record)?;
        }

        debug!(key, deleted = victims.len(), "deleted records by key");
        Ok(victims.len())
    }

    /// Append the record to the tail block and index it. Does not log and
    /// does not trigger compaction; shared by the insert path and log replay.
    fn apply_insert(&mut self, record: &Record) -> Result<RowAddress> {
        let (target, mut block) = if self.occupied_blocks == 0 {
            (1, Block::new(self.config.block_size))
        } else {
            let tail = self.disk.read_block(self.occupied_blocks)?;
            if tail.is_full() {
                (self.occupied_blocks + 1, Block::new(self.config.block_size))
            } else {
                (self.occupied_blocks, tail)
            }
        };

        let slot = block.insert(record)?;
        self.disk.write_block(target, &block)?;
        self.occupied_blocks = self.occupied_blocks.max(target);

        let addr = RowAddress::new(target, slot);
        self.index.insert(record.num_votes, addr);
        self.num_records += 1;
        Ok(addr)
    }

    /// Apply a logical delete: append a tombstone copy and drop the key from
    /// the index. Does not log; shared by the delete path and log replay.
    fn apply_delete(&mut self, record: &Record) -> Result<()> {
        self.apply_insert(&record.tombstoned())?;
        self.index.remove_all(record.num_votes);
        Ok(())
    }

    /// Fraction of the disk arena covered by allocated blocks
    pub fn disk_utilization(&self) -> f64 {
        (self.occupied_blocks * self.config.block_size) as f64
            / self.config.disk_capacity as f64
    }

    fn maybe_compact(&mut self) -> Result<()> {
        if self.disk_utilization() >= self.config.compaction_threshold {
            self.compact()?;
        }
        Ok(())
    }

    /// Rewrite all occupied blocks left-to-right, dropping tombstone slots
    /// and every record they superseded, then zero the freed trailing blocks
    /// and rebuild the index (survivor addresses all move).
    pub fn compact(&mut self) -> Result<()> {
        let old_blocks = self.occupied_blocks;

        // Records superseded by a tombstone copy die together with it
        let mut dead: HashSet<String> = HashSet::new();
        for n in 1..=old_blocks {
            for record in self.disk.read_block(n)?.records() {
                if record.tombstone {
                    dead.insert(record.uuid);
                }
            }
        }

        let mut index = BPlusTree::for_block_size(self.config.block_size);
        let mut out = Block::new(self.config.block_size);
        let mut out_number = 1;
        let mut survivors = 0;

        for n in 1..=old_blocks {
            for record in self.disk.read_block(n)?.records() {
                if record.tombstone || dead.contains(&record.uuid) {
                    continue;
                }
                if out.is_full() {
                    self.disk.write_block(out_number, &out)?;
                    out_number += 1;
                    out = Block::new(self.config.block_size);
                }
                let slot = out.insert(&record)?;
                index.insert(record.num_votes, RowAddress::new(out_number, slot));
                survivors += 1;
            }
        }

        let new_blocks = if out.record_count() > 0 {
            self.disk.write_block(out_number, &out)?;
            out_number
        } else {
            out_number - 1
        };

        for n in (new_blocks + 1)..=old_blocks {
            self.disk.clear_block(n)?;
        }

        self.occupied_blocks = new_blocks;
        self.num_records = survivors;
        self.index = index;

        info!(
            before = old_blocks,
            after = new_blocks,
            survivors,
            "compacted storage"
        );
        Ok(())
    }

    /// Index-assisted equality retrieval
    pub fn retrieve_by_num_votes(&self, key: i32) -> Result<QueryResult> {
        self.resolve(self.index.find(key))
    }

    /// Index-assisted range retrieval over `[min, max]`
    pub fn retrieve_by_num_votes_range(&self, min: i32, max: i32) -> Result<QueryResult> {
        self.resolve(self.index.find_range(min, max))
    }

    fn resolve(&self, addresses: Vec<RowAddress>) -> Result<QueryResult> {
        let blocks: HashSet<usize> = addresses.iter().map(|a| a.block).collect();
        let mut records = Vec::with_capacity(addresses.len());
        for addr in addresses {
            let record = self.disk.read_block(addr.block)?.record_at(addr.slot)?;
            if !record.tombstone {
                records.push(record);
            }
        }
        Ok(QueryResult::new(records, blocks.len()))
    }

    /// Exhaustive equality scan of every occupied block, the baseline the
    /// index-assisted path is measured against
    pub fn linear_scan_by_num_votes(&self, key: i32) -> Result<QueryResult> {
        self.linear_scan(|r| r.num_votes == key)
    }

    /// Exhaustive range scan over `[min, max]`
    pub fn linear_scan_by_num_votes_range(&self, min: i32, max: i32) -> Result<QueryResult> {
        self.linear_scan(|r| r.num_votes >= min && r.num_votes <= max)
    }

    /// Brute-force deletion: find the victims by scanning every occupied
    /// block instead of consulting the index, then delete them through the
    /// normal logged path. Benchmark counterpart of [`delete_by_num_votes`].
    ///
    /// [`delete_by_num_votes`]: StorageManager::delete_by_num_votes
    pub fn linear_scan_delete_by_num_votes(&mut self, key: i32) -> Result<usize> {
        let victims = self.linear_scan_by_num_votes(key)?.records;
        for record in &victims {
            self.delete_record(record)?;
        }
        debug!(key, deleted = victims.len(), "deleted records by linear scan");
        Ok(victims.len())
    }

    fn linear_scan(&self, matches: impl Fn(&Record) -> bool) -> Result<QueryResult> {
        let mut dead: HashSet<String> = HashSet::new();
        let mut candidates = Vec::new();
        for n in 1..=self.occupied_blocks {
            for record in self.disk.read_block(n)?.records() {
                if record.tombstone {
                    dead.insert(record.uuid);
                } else if matches(&record) {
                    candidates.push(record);
                }
            }
        }
        candidates.retain(|r| !dead.contains(&r.uuid));
        Ok(QueryResult::new(candidates, self.occupied_blocks))
    }

    /// Replay the write-ahead log over this (freshly opened) manager,
    /// returning the number of entries applied. Replay goes through the
    /// non-logging apply paths so the log is not rewritten, and the
    /// compaction trigger is evaluated once at the end.
    pub fn restore(&mut self) -> Result<usize> {
        let entries = self.wal.replay()?;
        let applied = entries.len();
        for entry in entries {
            match entry.operation {
                LogOperation::Insert => {
                    self.apply_insert(&entry.record)?;
                }
                LogOperation::Delete => {
                    self.apply_delete(&entry.record)?;
                }
            }
        }
        self.maybe_compact()?;
        info!(applied, "restored state from write-ahead log");
        Ok(applied)
    }

    /// Truncate the write-ahead log. Only sound once the disk image is
    /// durable elsewhere; here it marks the point restores start from.
    pub fn checkpoint(&mut self) -> Result<()> {
        self.wal.checkpoint()
    }

    /// Counters snapshot
    pub fn state(&self) -> StorageState {
        let stats = self.index.stats();
        StorageState {
            num_records: self.num_records,
            record_size: Record::SIZE,
            max_records_per_block: (self.config.block_size
                - crate::block::BLOCK_HEADER_SIZE)
                / Record::SIZE,
            occupied_blocks: self.occupied_blocks,
            disk_utilization: self.disk_utilization(),
            index_height: stats.height,
            index_nodes: stats.node_count,
            index_entries: stats.entries,
        }
    }

    /// Number of allocated blocks
    pub fn occupied_blocks(&self) -> usize {
        self.occupied_blocks
    }

    /// Physical record count, tombstone copies included
    pub fn num_records(&self) -> usize {
        self.num_records
    }

    /// Read one occupied block, for verbose state dumps
    pub fn read_block(&self, block_number: usize) -> Result<Block> {
        self.disk.read_block(block_number)
    }

    /// The configuration this manager was opened with
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }
}
