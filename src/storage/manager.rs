//! Storage Manager
//!
//! Manages multiple SSTables and coordinates reads/writes.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::error::{RefKvError, Result};
use crate::memtable::{MemTable, MemTableEntry};

use super::{SSTable, SSTableBuilder, SSTableReader};

const SSTABLE_PREFIX: &str = "sstable_";
const SSTABLE_EXT: &str = "sst";
const TEMP_EXT: &str = "tmp";

/// Manages the storage layer
///
/// ## Concurrency:
/// - `sstables`: RwLock; lookups share it, flushes take it exclusively
/// - `next_sstable_id`: Atomic counter (lock-free)
pub struct StorageManager {
    /// Directory where SSTables are stored
    data_dir: PathBuf,

    /// Open SSTable readers, ordered newest → oldest
    sstables: RwLock<Vec<SSTableReader>>,

    /// Next ID for creating new SSTables
    next_sstable_id: AtomicU64,
}

impl StorageManager {
    /// Open or create storage in the given directory
    ///
    /// Leftover `.tmp` files from an interrupted flush are removed; every
    /// `sstable_NNNNNN.sst` file is opened and validated.
    pub fn open(path: &Path) -> Result<Self> {
        fs::create_dir_all(path)?;

        let mut sstable_ids: Vec<u64> = Vec::new();

        for entry in fs::read_dir(path)? {
            let file_path = entry?.path();
            if !file_path.is_file() {
                continue;
            }

            if file_path.extension().is_some_and(|ext| ext == TEMP_EXT) {
                tracing::warn!(path = %file_path.display(), "removing unfinished SSTable");
                fs::remove_file(&file_path)?;
                continue;
            }

            if let Some(id) = Self::parse_sstable_id(&file_path) {
                sstable_ids.push(id);
            }
        }

        // Newest first
        sstable_ids.sort_unstable_by(|a, b| b.cmp(a));

        let mut sstables = Vec::with_capacity(sstable_ids.len());
        for id in &sstable_ids {
            sstables.push(SSTableReader::open(&Self::sstable_path_with_dir(path, *id))?);
        }

        let next_id = sstable_ids.first().map(|&id| id + 1).unwrap_or(1);

        tracing::debug!(
            dir = %path.display(),
            sstables = sstables.len(),
            next_id,
            "storage opened"
        );

        Ok(Self {
            data_dir: path.to_path_buf(),
            sstables: RwLock::new(sstables),
            next_sstable_id: AtomicU64::new(next_id),
        })
    }

    /// Get a value by key (searches all SSTables newest → oldest)
    ///
    /// Returns:
    /// - `Ok(Some(value))`: key found with value
    /// - `Ok(None)`: key not found, or newest entry is a tombstone
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let sstables = self.sstables.read();

        for reader in sstables.iter() {
            if !reader.might_contain(key) {
                continue;
            }

            match reader.get(key)? {
                Some(MemTableEntry::Value(value)) => return Ok(Some(value)),
                Some(MemTableEntry::Tombstone) => return Ok(None),
                None => continue,
            }
        }

        Ok(None)
    }

    /// Flush a MemTable to a new SSTable
    ///
    /// The table is written under a temporary name and renamed into place
    /// once complete, so a crash mid-flush never leaves a half-written table
    /// that would be picked up on reopen.
    pub fn flush(&self, memtable: &MemTable) -> Result<SSTable> {
        if memtable.is_empty() {
            return Err(RefKvError::Storage("Cannot flush empty MemTable".to_string()));
        }

        let id = self.next_sstable_id.fetch_add(1, Ordering::SeqCst);
        let path = self.sstable_path(id);
        let temp_path = path.with_extension(TEMP_EXT);

        let mut builder = SSTableBuilder::new(&temp_path)?;
        for (key, entry) in memtable.iter() {
            match entry {
                MemTableEntry::Value(v) => builder.add(&key, &v)?,
                MemTableEntry::Tombstone => builder.add_tombstone(&key)?,
            }
        }
        let mut metadata = builder.finish()?;

        fs::rename(&temp_path, &path)?;
        metadata.path = path.clone();

        let reader = SSTableReader::open(&path)?;
        self.sstables.write().insert(0, reader);

        tracing::info!(
            id,
            entries = metadata.entry_count,
            bytes = metadata.file_size,
            "flushed memtable to SSTable"
        );

        Ok(metadata)
    }

    pub fn sstable_count(&self) -> usize {
        self.sstables.read().len()
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn next_sstable_id(&self) -> u64 {
        self.next_sstable_id.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn sstable_path(&self, id: u64) -> PathBuf {
        Self::sstable_path_with_dir(&self.data_dir, id)
    }

    fn sstable_path_with_dir(dir: &Path, id: u64) -> PathBuf {
        dir.join(format!("{}{:06}.{}", SSTABLE_PREFIX, id, SSTABLE_EXT))
    }

    /// "sstable_000042.sst" → Some(42)
    fn parse_sstable_id(path: &Path) -> Option<u64> {
        if path.extension()? != SSTABLE_EXT {
            return None;
        }
        let name = path.file_stem()?.to_string_lossy();
        name.strip_prefix(SSTABLE_PREFIX)?.parse().ok()
    }
}
