//! Configuration for refkv
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{RefKvError, Result};

/// Main configuration for a refkv store
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files (lock, WAL, SSTables)
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── LOCK             (advisory directory lock)
    ///     ├── wal.log          (write-ahead log)
    ///     └── sstables/        (SSTable files)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync WAL
    pub wal_sync_strategy: WalSyncStrategy,

    // -------------------------------------------------------------------------
    // MemTable Configuration
    // -------------------------------------------------------------------------
    /// Max size of memtable before flush (in bytes)
    pub memtable_size_limit: usize,

    // -------------------------------------------------------------------------
    // Reference Store Configuration
    // -------------------------------------------------------------------------
    /// Extra attempts a refcount mutation makes after a write conflict
    /// before surfacing `RefKvError::Conflict`
    pub max_commit_retries: u32,

    /// Remove all on-disk state when the handle is dropped while still open
    pub destroy_on_drop: bool,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N uncommitted entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./refkv_data"),
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
            memtable_size_limit: 64 * 1024 * 1024, // 64 MB
            max_commit_retries: 16,
            destroy_on_drop: false,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.memtable_size_limit == 0 {
            return Err(RefKvError::Config(
                "memtable_size_limit must be greater than zero".to_string(),
            ));
        }

        if let WalSyncStrategy::EveryNEntries { count: 0 } = self.wal_sync_strategy {
            return Err(RefKvError::Config(
                "EveryNEntries sync count must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the memtable size limit (in bytes)
    pub fn memtable_size_limit(mut self, size: usize) -> Self {
        self.config.memtable_size_limit = size;
        self
    }

    /// Set how many times a conflicting refcount mutation is retried
    pub fn max_commit_retries(mut self, retries: u32) -> Self {
        self.config.max_commit_retries = retries;
        self
    }

    /// Destroy on-disk state when the handle is dropped
    pub fn destroy_on_drop(mut self, destroy: bool) -> Self {
        self.config.destroy_on_drop = destroy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
