//! Engine Module
//!
//! The embedded transactional key-value engine underneath the reference
//! store.
//!
//! ## Responsibilities
//! - Coordinate WAL, MemTable, and Storage
//! - Run single-key transactions with optimistic read validation
//! - Trigger flushes when the MemTable is full
//! - Recover committed state from the WAL on startup

mod transaction;

pub use transaction::Transaction;

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{RefKvError, Result};
use crate::memtable::{MemTable, MemTableEntry};
use crate::storage::StorageManager;
use crate::wal::{Operation, WalRecovery, WalWriter};

/// The main storage engine
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Commits** (and flushes) are serialized by the WAL mutex. A commit
///   validates its transaction's read, appends to the WAL, then applies to
///   the MemTable, all while holding it.
/// - **Reads** never take the WAL mutex. They consult the MemTable (RwLock)
///   and then the SSTables (RwLock on the table list) and always observe the
///   latest committed value.
pub struct Engine {
    config: Config,

    /// Directory for SSTables
    storage_dir: PathBuf,

    /// Write-ahead log; holding this lock is holding the write lock
    wal: Mutex<WalWriter>,

    /// Writes committed since the last flush
    memtable: MemTable,

    /// Flushed, immutable tables
    storage: StorageManager,
}

impl Engine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    pub(crate) const WAL_FILENAME: &'static str = "wal.log";
    pub(crate) const SSTABLE_DIR: &'static str = "sstables";

    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Open/create data directory
    /// 2. Load existing SSTables
    /// 3. Replay the WAL (dropping any torn or corrupt tail)
    /// 4. Flush replayed entries so the WAL can start empty
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let storage_dir = config.data_dir.join(Self::SSTABLE_DIR);
        let wal_path = config.data_dir.join(Self::WAL_FILENAME);

        let storage = StorageManager::open(&storage_dir)?;
        let memtable = MemTable::new();

        let mut replayed = false;
        if wal_path.exists() {
            let (entries, recovery) = WalRecovery::recover(&wal_path)?;

            if recovery.entries_recovered > 0 || recovery.entries_corrupted > 0 {
                tracing::info!(
                    recovered = recovery.entries_recovered,
                    corrupted = recovery.entries_corrupted,
                    last_lsn = recovery.last_lsn,
                    truncated = recovery.was_truncated,
                    "WAL recovery"
                );
            }

            for entry in entries {
                match entry.operation {
                    Operation::Put { key, value } => {
                        memtable.put(key, value);
                    }
                    Operation::Delete { key } => {
                        memtable.delete(key);
                    }
                }
            }

            // Replayed data must reach an SSTable before the WAL is emptied
            if !memtable.is_empty() {
                storage.flush(&memtable)?;
                memtable.clear();
                replayed = true;
            }
        }

        let mut wal = WalWriter::open(&wal_path, config.wal_sync_strategy)?;
        if replayed {
            wal.truncate()?;
        }

        tracing::info!(
            data_dir = %config.data_dir.display(),
            sstables = storage.sstable_count(),
            "engine opened"
        );

        Ok(Self {
            config,
            storage_dir,
            wal: Mutex::new(wal),
            memtable,
            storage,
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Get the latest committed value for a key
    ///
    /// Search order:
    /// 1. MemTable (most recent commits)
    /// 2. SSTables (newest to oldest)
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Some(entry) = self.memtable.get(key) {
            return match entry {
                MemTableEntry::Value(value) => Ok(Some(value)),
                MemTableEntry::Tombstone => Ok(None),
            };
        }

        self.storage.get(key)
    }

    /// Start a single-key transaction
    pub fn begin_transaction(&self) -> Transaction<'_> {
        Transaction::new(self)
    }

    /// Put a key-value pair in its own transaction
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut txn = self.begin_transaction();
        txn.put(key, value)?;
        txn.commit()
    }

    /// Delete a key in its own transaction
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        let mut txn = self.begin_transaction();
        txn.delete(key)?;
        txn.commit()
    }

    /// Commit one mutation, optionally guarded by a previously observed value
    ///
    /// With `expected = Some((key, observed))` the commit only proceeds if the
    /// key's committed value still equals `observed`; otherwise nothing is
    /// written and `RefKvError::Conflict` is returned.
    pub(crate) fn commit(
        &self,
        operation: Operation,
        expected: Option<(&[u8], &Option<Vec<u8>>)>,
    ) -> Result<u64> {
        let mut wal = self.wal.lock();

        if let Some((key, observed)) = expected {
            let current = self.get(key)?;
            if current.as_ref() != observed.as_ref() {
                tracing::debug!(key = %hex::encode(key), "commit conflict");
                return Err(RefKvError::Conflict { key: key.to_vec() });
            }
        }

        // Durable first; nothing is visible if this fails
        let lsn = wal.append(&operation)?;

        let new_size = match operation {
            Operation::Put { key, value } => self.memtable.put(key, value),
            Operation::Delete { key } => self.memtable.delete(key),
        };

        if new_size >= self.config.memtable_size_limit {
            // The commit is already durable in the WAL; a failed flush is
            // retried by the next commit that crosses the limit
            if let Err(e) = self.flush_locked(&mut wal) {
                tracing::error!(error = %e, "memtable flush failed");
            }
        }

        Ok(lsn)
    }

    /// Flush memtable to disk
    ///
    /// Forces a flush regardless of memtable size
    pub fn flush(&self) -> Result<()> {
        let mut wal = self.wal.lock();
        self.flush_locked(&mut wal)
    }

    /// Flush with the WAL lock already held
    fn flush_locked(&self, wal: &mut WalWriter) -> Result<()> {
        if self.memtable.is_empty() {
            return Ok(());
        }

        self.storage.flush(&self.memtable)?;
        self.memtable.clear();

        // Entries are now durable in the SSTable
        wal.truncate()
    }

    /// Close the engine gracefully
    ///
    /// Flushes any pending data and syncs the WAL
    pub fn close(self) -> Result<()> {
        let mut wal = self.wal.lock();
        self.flush_locked(&mut wal)?;
        wal.sync()?;

        tracing::info!(data_dir = %self.config.data_dir.display(), "engine closed");
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Where SSTables are stored
    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn memtable_size(&self) -> usize {
        self.memtable.size()
    }

    pub fn memtable_entry_count(&self) -> usize {
        self.memtable.entry_count()
    }

    pub fn sstable_count(&self) -> usize {
        self.storage.sstable_count()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
