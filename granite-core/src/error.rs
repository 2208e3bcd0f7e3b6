//! Error types for Granite

use thiserror::Error;

/// Result type alias for Granite operations
pub type Result<T> = std::result::Result<T, GraniteError>;

/// Granite error types
#[derive(Error, Debug)]
pub enum GraniteError {
    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Block has no free slot left
    #[error("Block full: capacity {capacity} records")]
    BlockFull { capacity: usize },

    /// Slot index outside the populated range of a block
    #[error("Invalid slot {slot}: block holds {count} records")]
    InvalidSlot { slot: usize, count: usize },

    /// Insert position would leave a gap or overflow the block
    #[error("Invalid insert position {position}: block holds {count} records")]
    InvalidPosition { position: usize, count: usize },

    /// Block number outside the disk arena
    #[error("Disk full: block {block} exceeds capacity of {max_blocks} blocks")]
    DiskFull { block: usize, max_blocks: usize },

    /// Record with the given uuid is not present
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// Invalid data format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// WAL replay error
    #[error("WAL replay error: {0}")]
    WalReplay(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Seed batch exceeds disk capacity
    #[error("Seed data ({bytes} bytes) exceeds usable disk capacity ({capacity} bytes)")]
    SeedTooLarge { bytes: usize, capacity: usize },
}

impl GraniteError {
    /// Check if error is a capacity violation (programmer error)
    pub fn is_capacity(&self) -> bool {
        matches!(
            self,
            GraniteError::BlockFull { .. }
                | GraniteError::InvalidSlot { .. }
                | GraniteError::InvalidPosition { .. }
                | GraniteError::DiskFull { .. }
        )
    }
}
