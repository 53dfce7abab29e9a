//! WAL Writer
//!
//! Handles appending entries to the WAL file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::{RefKvError, Result};

use super::entry::now_millis;
use super::{Operation, WalEntry, WalRecovery};

/// Writes entries to the WAL file
///
/// Each entry goes to the OS in a single `write_all`. If that write fails the
/// file is cut back to its previous length, so a failed append never leaves a
/// torn entry in front of later ones.
pub struct WalWriter {
    path: PathBuf,
    file: File,
    /// LSN assigned to the next appended entry
    next_lsn: u64,
    /// Length of the file after the last successful append
    file_len: u64,
    sync_strategy: WalSyncStrategy,
    /// Entries written since the last fsync
    uncommitted: usize,
}

impl WalWriter {
    /// Open or create a WAL file
    ///
    /// An existing file is scanned so numbering continues after its last
    /// valid LSN.
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let next_lsn = if path.exists() {
            WalRecovery::verify(path)?.last_lsn + 1
        } else {
            1
        };

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let file_len = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            next_lsn,
            file_len,
            sync_strategy,
            uncommitted: 0,
        })
    }

    /// Append an operation to the WAL, returning its LSN
    pub fn append(&mut self, operation: &Operation) -> Result<u64> {
        let lsn = self.next_lsn;
        let bytes = WalEntry::encode(lsn, now_millis(), operation)?;

        if let Err(e) = self.file.write_all(&bytes) {
            self.rollback_tail();
            return Err(RefKvError::WalWrite(format!("append of lsn {} failed: {}", lsn, e)));
        }

        let must_sync = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => self.uncommitted + 1 >= count,
        };
        if must_sync {
            if let Err(e) = self.sync() {
                // The entry is not acknowledged, so it must not replay later
                self.rollback_tail();
                return Err(e);
            }
        } else {
            self.uncommitted += 1;
        }

        self.file_len += bytes.len() as u64;
        self.next_lsn += 1;

        tracing::trace!(lsn, bytes = bytes.len(), "WAL append");
        Ok(lsn)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file
            .sync_data()
            .map_err(|e| RefKvError::WalWrite(format!("fsync failed: {}", e)))?;
        self.uncommitted = 0;
        Ok(())
    }

    /// Discard all entries (after their effects reached an SSTable)
    pub fn truncate(&mut self) -> Result<()> {
        self.file.set_len(0)?;
        self.file.sync_all()?;
        self.file_len = 0;
        self.next_lsn = 1;
        self.uncommitted = 0;
        Ok(())
    }

    /// Get the LSN the next entry will receive
    pub fn current_lsn(&self) -> u64 {
        self.next_lsn
    }

    /// Number of entries written since the last fsync
    pub fn uncommitted_count(&self) -> usize {
        self.uncommitted
    }

    /// Path of the underlying file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn rollback_tail(&mut self) {
        if let Err(e) = self.file.set_len(self.file_len) {
            tracing::error!(
                path = %self.path.display(),
                error = %e,
                "failed to cut torn WAL tail; recovery will discard it"
            );
        }
    }
}
