//! Bulk TSV ingestion
//!
//! Loads a tab-separated ratings dump (header row, then
//! `uuid \t rating \t num_votes` per line) through the storage manager's
//! normal insert path. The whole file is parsed and size-checked before any
//! record is inserted, so a too-large seed never half-applies.

use crate::block::BLOCK_HEADER_SIZE;
use crate::storage::StorageManager;
use crate::{GraniteError, Record, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{info, warn};

/// Outcome of one seed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedSummary {
    /// Records inserted
    pub inserted: usize,
    /// Malformed lines skipped
    pub skipped: usize,
}

/// Parse and insert every row of the TSV file at `path`.
/// Malformed lines (wrong column count, unparsable numbers) are skipped
/// with a warning; an unreadable file or an oversized seed is an error and
/// inserts nothing.
pub fn seed_tsv(path: impl AsRef<Path>, manager: &mut StorageManager) -> Result<SeedSummary> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);

    let mut records = Vec::new();
    let mut skipped = 0;

    // first line is the header row
    for (number, line) in reader.lines().enumerate().skip(1) {
        let line = line?;
        match parse_line(&line) {
            Some(record) => records.push(record),
            None => {
                warn!(line = number + 1, "skipping malformed seed line");
                skipped += 1;
            }
        }
    }

    // Capacity in record slots, not raw bytes: every block loses its
    // header to overhead, so a byte comparison over-counts what fits
    let config = manager.config();
    let slots_per_block = (config.block_size - BLOCK_HEADER_SIZE) / Record::SIZE;
    let slot_capacity = (config.disk_capacity / config.block_size) * slots_per_block;
    if records.len() > slot_capacity {
        return Err(GraniteError::SeedTooLarge {
            bytes: records.len() * Record::SIZE,
            capacity: slot_capacity * Record::SIZE,
        });
    }

    for record in &records {
        manager.insert_record(record)?;
    }

    info!(
        path = %path.display(),
        inserted = records.len(),
        skipped,
        "seeded storage from file"
    );
    Ok(SeedSummary {
        inserted: records.len(),
        skipped,
    })
}

fn parse_line(line: &str) -> Option<Record> {
    let mut parts = line.split('\t');
    let uuid = parts.next()?;
    let rating: f32 = parts.next()?.trim().parse().ok()?;
    let num_votes: i32 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(Record::new(uuid, rating, num_votes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageConfig;
    use std::io::Write;
    use tempfile::TempDir;

    fn manager(dir: &TempDir, capacity: usize) -> StorageManager {
        let config = StorageConfig::default()
            .with_block_size(200)
            .with_disk_capacity(capacity)
            .with_wal_path(dir.path().join("granite.wal"));
        StorageManager::open(config).unwrap()
    }

    fn write_tsv(dir: &TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("ratings.tsv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "tconst\taverageRating\tnumVotes").unwrap();
        write!(file, "{}", body).unwrap();
        path
    }

    #[test]
    fn test_seed_inserts_all_rows() {
        let dir = TempDir::new().unwrap();
        let mut mgr = manager(&dir, 2000);
        let path = write_tsv(&dir, "tt0000001\t5.6\t1645\ntt0000002\t6.1\t198\n");

        let summary = seed_tsv(&path, &mut mgr).unwrap();
        assert_eq!(summary, SeedSummary { inserted: 2, skipped: 0 });

        let result = mgr.retrieve_by_num_votes(1645).unwrap();
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].uuid, "tt0000001");
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let mut mgr = manager(&dir, 2000);
        let path = write_tsv(
            &dir,
            "tt0000001\t5.6\t1645\nnot-enough-columns\ntt0000003\tbad\t7\ntt0000004\t2.0\t9\n",
        );

        let summary = seed_tsv(&path, &mut mgr).unwrap();
        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.skipped, 2);
        assert_eq!(mgr.num_records(), 2);
    }

    #[test]
    fn test_oversized_seed_inserts_nothing() {
        let dir = TempDir::new().unwrap();
        // room for 9 records only
        let mut mgr = manager(&dir, 200);

        let mut body = String::new();
        for i in 0..50 {
            body.push_str(&format!("tt{:07}\t5.0\t{}\n", i, i));
        }
        let path = write_tsv(&dir, &body);

        let result = seed_tsv(&path, &mut mgr);
        assert!(matches!(result, Err(GraniteError::SeedTooLarge { .. })));
        assert_eq!(mgr.num_records(), 0);
    }

    #[test]
    fn test_seed_fitting_by_bytes_but_not_by_slots_is_rejected() {
        let dir = TempDir::new().unwrap();
        // 10 blocks of 9 slots = 90 records; 95 records are only 1900
        // bytes, under the 2000-byte arena, but exceed the slot capacity
        let mut mgr = manager(&dir, 2000);

        let mut body = String::new();
        for i in 0..95 {
            body.push_str(&format!("tt{:07}\t5.0\t{}\n", i, i));
        }
        let path = write_tsv(&dir, &body);

        let result = seed_tsv(&path, &mut mgr);
        assert!(matches!(result, Err(GraniteError::SeedTooLarge { .. })));
        assert_eq!(mgr.num_records(), 0);
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let mut mgr = manager(&dir, 2000);
        let result = seed_tsv(dir.path().join("absent.tsv"), &mut mgr);
        assert!(matches!(result, Err(GraniteError::Io(_))));
    }
}
