//! Storage manager - coordinates disk, index and log

mod manager;

pub use manager::{QueryResult, StorageManager, StorageState};

use std::path::PathBuf;

/// Storage manager configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Block size in bytes
    pub block_size: usize,
    /// Simulated disk capacity in bytes
    pub disk_capacity: usize,
    /// Disk utilization fraction at which compaction runs
    pub compaction_threshold: f64,
    /// Path of the write-ahead log file
    pub wal_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            block_size: crate::config::BLOCK_SIZE,
            disk_capacity: crate::config::DISK_CAPACITY,
            compaction_threshold: crate::config::COMPACTION_THRESHOLD,
            wal_path: PathBuf::from("data/granite.wal"),
        }
    }
}

impl StorageConfig {
    /// Override the block size
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Override the disk capacity
    pub fn with_disk_capacity(mut self, disk_capacity: usize) -> Self {
        self.disk_capacity = disk_capacity;
        self
    }

    /// Override the compaction threshold
    pub fn with_compaction_threshold(mut self, threshold: f64) -> Self {
        self.compaction_threshold = threshold;
        self
    }

    /// Override the write-ahead log path
    pub fn with_wal_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.wal_path = path.into();
        self
    }
}
