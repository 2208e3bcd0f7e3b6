//! Granite Core - Single-Node Record Storage Engine
//!
//! A block-structured storage engine over a simulated fixed-size disk:
//!
//! - **Record codec**: fixed-width binary encoding of one row plus a
//!   tombstone flag
//! - **Block / Disk**: fixed-capacity record containers packed into a
//!   preallocated in-memory byte arena
//! - **B+ tree index**: in-memory, arena-based, mapping a non-unique
//!   `num_votes` key to physical addresses
//! - **WAL (Write-Ahead Log)**: durability guarantee through sequential
//!   writes, replayed for crash recovery
//! - **Storage manager**: log-then-apply mutations, tombstone deletes and
//!   threshold-driven compaction that keeps the index consistent
//!
//! The engine is single-threaded by contract: every public operation runs
//! to completion before returning, and a `StorageManager` must be owned
//! exclusively.

pub mod block;
pub mod disk;
pub mod index;
pub mod seed;
pub mod storage;
pub mod wal;

mod error;
mod types;

pub use error::{GraniteError, Result};
pub use types::{Record, RowAddress};

/// Granite version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
pub mod config {
    /// Block size in bytes (4-byte header + record slots)
    pub const BLOCK_SIZE: usize = 200;

    /// Simulated disk capacity (500 MiB)
    pub const DISK_CAPACITY: usize = 500 * 1024 * 1024;

    /// Disk utilization threshold that triggers compaction
    pub const COMPACTION_THRESHOLD: f64 = 0.9;

    /// Index key width used to size tree fan-out
    pub const KEY_SIZE: usize = 4;

    /// Index pointer width used to size tree fan-out
    pub const POINTER_SIZE: usize = 8;
}
