//! Append-only log file

use super::{LogEntry, LogOperation};
use crate::{Record, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Write-ahead log backed by a single append-only file of fixed-width
/// entries. Every mutation is appended and flushed before the caller touches
/// the disk image, so replaying the file after a crash reconstructs every
/// acknowledged change.
pub struct WriteAheadLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl WriteAheadLog {
    /// Open the log at `path`, creating it if absent. Existing entries are
    /// preserved; new entries append after them.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry and flush it to the file before returning
    pub fn append(&mut self, operation: LogOperation, record: &Record) -> Result<()> {
        let entry = LogEntry {
            operation,
            record: record.clone(),
        };
        self.writer.write_all(&entry.encode())?;
        self.writer.flush()?;
        Ok(())
    }

    /// Read every complete entry back from the file, in append order.
    /// A torn trailing write (a tail shorter than one entry) is dropped
    /// with a warning.
    pub fn replay(&self) -> Result<Vec<LogEntry>> {
        let mut data = Vec::new();
        File::open(&self.path)?.read_to_end(&mut data)?;

        let complete = data.len() / LogEntry::SIZE;
        let torn = data.len() % LogEntry::SIZE;
        if torn != 0 {
            warn!(
                path = %self.path.display(),
                bytes = torn,
                "dropping torn entry at end of write-ahead log"
            );
        }

        let mut entries = Vec::with_capacity(complete);
        for i in 0..complete {
            let offset = i * LogEntry::SIZE;
            let entry = LogEntry::decode(&data[offset..offset + LogEntry::SIZE])
                .map_err(|e| crate::GraniteError::WalReplay(format!(
                    "entry {} at offset {}: {}",
                    i, offset, e
                )))?;
            entries.push(entry);
        }
        info!(
            path = %self.path.display(),
            entries = entries.len(),
            "replayed write-ahead log"
        );
        Ok(entries)
    }

    /// Number of complete entries currently in the file
    pub fn len(&self) -> Result<usize> {
        let bytes = std::fs::metadata(&self.path)?.len() as usize;
        Ok(bytes / LogEntry::SIZE)
    }

    /// Whether the file holds no complete entry
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Truncate the log. Called once the disk image reflects every logged
    /// entry; the swap goes through a temp file and rename so a crash
    /// mid-checkpoint leaves either the old log or an empty one.
    pub fn checkpoint(&mut self) -> Result<()> {
        self.writer.flush()?;

        let tmp = self.path.with_extension("tmp");
        File::create(&tmp)?.sync_all()?;
        std::fs::rename(&tmp, &self.path)?;

        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        self.writer = BufWriter::new(file);
        info!(path = %self.path.display(), "checkpointed write-ahead log");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample(n: i32) -> Record {
        Record::new(format!("tt{:07}", n), n as f32 / 10.0, n)
    }

    #[test]
    fn test_append_and_replay() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("granite.wal");

        let mut wal = WriteAheadLog::open(&path).unwrap();
        wal.append(LogOperation::Insert, &sample(1)).unwrap();
        wal.append(LogOperation::Insert, &sample(2)).unwrap();
        wal.append(LogOperation::Delete, &sample(1).tombstoned())
            .unwrap();

        let entries = wal.replay().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].operation, LogOperation::Insert);
        assert_eq!(entries[0].record, sample(1));
        assert_eq!(entries[2].operation, LogOperation::Delete);
        assert!(entries[2].record.tombstone);
    }

    #[test]
    fn test_reopen_appends_after_existing_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("granite.wal");

        {
            let mut wal = WriteAheadLog::open(&path).unwrap();
            wal.append(LogOperation::Insert, &sample(1)).unwrap();
        }
        let mut wal = WriteAheadLog::open(&path).unwrap();
        wal.append(LogOperation::Insert, &sample(2)).unwrap();

        let entries = wal.replay().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].record, sample(2));
    }

    #[test]
    fn test_replay_drops_torn_tail() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("granite.wal");

        let mut wal = WriteAheadLog::open(&path).unwrap();
        wal.append(LogOperation::Insert, &sample(1)).unwrap();
        drop(wal);

        // Simulate a crash mid-append
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&[0u8; 7]).unwrap();
        drop(file);

        let wal = WriteAheadLog::open(&path).unwrap();
        let entries = wal.replay().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].record, sample(1));
    }

    #[test]
    fn test_checkpoint_empties_the_log() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("granite.wal");

        let mut wal = WriteAheadLog::open(&path).unwrap();
        wal.append(LogOperation::Insert, &sample(1)).unwrap();
        wal.append(LogOperation::Insert, &sample(2)).unwrap();
        assert_eq!(wal.len().unwrap(), 2);

        wal.checkpoint().unwrap();
        assert!(wal.is_empty().unwrap());
        assert!(wal.replay().unwrap().is_empty());

        // The log is still writable after the swap
        wal.append(LogOperation::Insert, &sample(3)).unwrap();
        let entries = wal.replay().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].record, sample(3));
    }
}
