//! Store handle
//!
//! Owns an [`Engine`] for its whole lifetime together with an exclusive
//! advisory lock on the data directory. Teardown either keeps the data
//! (`close`) or removes the engine's files (`close_and_destroy`); both are
//! idempotent, and `Drop` runs whichever the config asks for if the caller
//! did neither.

use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::Path;

use fs2::FileExt;

use crate::config::Config;
use crate::engine::{Engine, Transaction};
use crate::error::{RefKvError, Result};

const LOCK_FILENAME: &str = "LOCK";
const TEMP_EXT: &str = "tmp";

/// Engine plus the directory lock that guards it
struct OpenStore {
    engine: Engine,
    // Released when dropped
    _lock: File,
}

/// Exclusive owner of one store directory
pub struct StoreHandle {
    config: Config,
    store: Option<OpenStore>,
    destroyed: bool,
}

impl StoreHandle {
    /// Open (creating if absent) a store at `path` with default settings
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(Config::builder().data_dir(path.as_ref()).build())
    }

    /// Open (creating if absent) the store described by `config`
    ///
    /// Every failure is reported as `RefKvError::Open`.
    pub fn open_with(config: Config) -> Result<Self> {
        let store = Self::open_store(&config).map_err(|e| {
            tracing::error!(
                data_dir = %config.data_dir.display(),
                error = %e,
                "failed to open store"
            );
            RefKvError::open(&config.data_dir, e)
        })?;

        Ok(Self {
            config,
            store: Some(store),
            destroyed: false,
        })
    }

    fn open_store(config: &Config) -> Result<OpenStore> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;
        let lock = Self::acquire_lock(&config.data_dir)?;
        let engine = Engine::open(config.clone())?;

        Ok(OpenStore {
            engine,
            _lock: lock,
        })
    }

    fn acquire_lock(dir: &Path) -> Result<File> {
        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(dir.join(LOCK_FILENAME))?;

        match lock_file.try_lock_exclusive() {
            Ok(()) => Ok(lock_file),
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
                Err(RefKvError::Locked)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The open engine, or `Closed` after teardown
    pub fn engine(&self) -> Result<&Engine> {
        self.store
            .as_ref()
            .map(|store| &store.engine)
            .ok_or(RefKvError::Closed)
    }

    /// Point lookup of the latest committed value; `None` means not found
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.engine()?.get(key)
    }

    /// Start a single-key transaction
    pub fn begin_transaction(&self) -> Result<Transaction<'_>> {
        Ok(self.engine()?.begin_transaction())
    }

    /// Flush, sync, and release the directory, keeping its contents
    ///
    /// Calling this on a closed handle does nothing.
    pub fn close(&mut self) -> Result<()> {
        match self.store.take() {
            Some(store) => store.engine.close(),
            None => Ok(()),
        }
    }

    /// Release the engine and remove the files it owns
    ///
    /// Only the lock file, WAL, SSTable directory and unfinished flush files
    /// are deleted; the data directory itself is removed only if that leaves
    /// it empty. The directory lock is held until the engine's files are gone.
    /// Safe to call more than once, including from `Drop`.
    pub fn close_and_destroy(&mut self) -> Result<()> {
        if self.destroyed {
            return Ok(());
        }

        // Contents are about to be removed; skip the flush
        let lock = self.store.take().map(|OpenStore { engine, _lock: lock }| {
            drop(engine);
            lock
        });

        let dir = &self.config.data_dir;
        remove_if_present(fs::remove_dir_all(dir.join(Engine::SSTABLE_DIR)))?;
        remove_if_present(fs::remove_file(dir.join(Engine::WAL_FILENAME)))?;
        Self::remove_unfinished(dir)?;
        remove_if_present(fs::remove_file(dir.join(LOCK_FILENAME)))?;
        drop(lock);

        if Self::is_empty_dir(dir)? {
            remove_if_present(fs::remove_dir(dir))?;
        } else {
            tracing::debug!(data_dir = %dir.display(), "data directory left in place");
        }
        self.destroyed = true;

        tracing::info!(data_dir = %dir.display(), "store destroyed");
        Ok(())
    }

    /// Leftover `.tmp` files in the data directory
    fn remove_unfinished(dir: &Path) -> Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == TEMP_EXT) {
                remove_if_present(fs::remove_file(&path))?;
            }
        }
        Ok(())
    }

    fn is_empty_dir(dir: &Path) -> Result<bool> {
        match fs::read_dir(dir) {
            Ok(mut entries) => Ok(entries.next().is_none()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub fn is_open(&self) -> bool {
        self.store.is_some()
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for StoreHandle {
    fn drop(&mut self) {
        if !self.is_open() {
            return;
        }

        let result = if self.config.destroy_on_drop {
            self.close_and_destroy()
        } else {
            self.close()
        };

        if let Err(e) = result {
            tracing::error!(
                data_dir = %self.config.data_dir.display(),
                error = %e,
                "store teardown failed"
            );
        }
    }
}

/// Treat an already-missing path as removed
fn remove_if_present(result: std::io::Result<()>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
