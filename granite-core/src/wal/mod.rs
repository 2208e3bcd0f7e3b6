//! Write-ahead log
//!
//! Durability layer: every insert and delete is appended to an on-disk log
//! and flushed before the in-memory disk image is touched. After a crash,
//! replaying the log over a fresh store reconstructs every acknowledged
//! mutation; a checkpoint truncates the log once the disk image is known to
//! reflect it.

mod entry;
mod log;

pub use entry::{LogEntry, LogOperation};
pub use log::WriteAheadLog;
