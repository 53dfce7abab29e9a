//! Reference-counted store
//!
//! Content-addressed values shared by any number of logical owners. Each key
//! holds one record `(reference_count, value)`; saving adds a reference,
//! deleting releases one, and the record is physically removed when the last
//! reference goes.
//!
//! ## Mutation protocol
//!
//! Every mutation is a read-modify-write inside one transaction:
//!
//! 1. `get_for_update` the record (tracked read)
//! 2. decode it and compute the new state
//! 3. stage a put of the re-encoded record, or a delete
//! 4. commit; the engine re-checks the tracked read under its write lock
//!
//! A commit that loses a race fails with `Conflict` and the whole cycle runs
//! again from step 1, up to `Config::max_commit_retries` extra times. Engine
//! errors are returned immediately and never retried.

use std::path::Path;

use crate::codec;
use crate::config::Config;
use crate::engine::Transaction;
use crate::error::{RefKvError, Result};
use crate::handle::StoreHandle;
use crate::types::{DeleteResult, GetResult, SaveResult, StoredRecord};

/// What a mutation decided to do with the record it read
enum Plan<T> {
    /// Persist a new count with the record's value
    Put { count: u32, value: Vec<u8>, outcome: T },
    /// Remove the record
    Delete { outcome: T },
    /// Leave the store untouched
    Skip { outcome: T },
}

/// Reference-counted, content-addressed value store
pub struct RefCountedStore {
    handle: StoreHandle,
}

impl RefCountedStore {
    /// Open (creating if absent) a store at `path` with default settings
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_handle(StoreHandle::open(path)?))
    }

    /// Open (creating if absent) the store described by `config`
    pub fn open_with(config: Config) -> Result<Self> {
        Ok(Self::from_handle(StoreHandle::open_with(config)?))
    }

    pub fn from_handle(handle: StoreHandle) -> Self {
        Self { handle }
    }

    // =========================================================================
    // Reference Operations
    // =========================================================================

    /// Look up the record under `key`
    pub fn get_value(&self, key: &[u8]) -> Result<GetResult> {
        let result = match self.handle.get(key)? {
            Some(raw) => match live_record(key, raw)? {
                Some(record) => GetResult::Found(record),
                None => GetResult::NotFound,
            },
            None => GetResult::NotFound,
        };

        tracing::trace!(
            key = %hex::encode(key),
            count = result.reference_count(),
            "get_value"
        );
        Ok(result)
    }

    /// Add a reference to `value` under `key`, creating the record if needed
    ///
    /// Saving a different value under a key that already holds a record is a
    /// contract violation (a hash collision or a caller bug) and fails with
    /// `RefKvError::ValueMismatch` without touching the store.
    pub fn save(&self, key: &[u8], value: &[u8]) -> Result<SaveResult> {
        let result = self.mutate(key, |current| match current {
            None => Ok(Plan::Put {
                count: 1,
                value: value.to_vec(),
                outcome: 1,
            }),
            Some(record) => {
                if record.value.as_ref() != value {
                    return Err(RefKvError::ValueMismatch { key: key.to_vec() });
                }
                let count = bump(key, record.reference_count)?;
                Ok(Plan::Put {
                    count,
                    value: record.value.to_vec(),
                    outcome: count,
                })
            }
        })?;

        tracing::debug!(key = %hex::encode(key), count = result, "save");
        Ok(SaveResult::Saved {
            key: key.to_vec(),
            reference_count: result,
        })
    }

    /// Add a reference to an existing record
    ///
    /// Never creates a record: an absent key yields `SaveResult::NotFound`.
    pub fn increment_reference(&self, key: &[u8]) -> Result<SaveResult> {
        let result = self.mutate(key, |current| match current {
            None => Ok(Plan::Skip { outcome: None }),
            Some(record) => {
                let count = bump(key, record.reference_count)?;
                Ok(Plan::Put {
                    count,
                    value: record.value.to_vec(),
                    outcome: Some(count),
                })
            }
        })?;

        tracing::debug!(key = %hex::encode(key), count = ?result, "increment_reference");
        Ok(match result {
            Some(reference_count) => SaveResult::Saved {
                key: key.to_vec(),
                reference_count,
            },
            None => SaveResult::NotFound { key: key.to_vec() },
        })
    }

    /// Release one reference, deleting the record with its last reference
    pub fn delete_value(&self, key: &[u8]) -> Result<DeleteResult> {
        let result = self.mutate(key, |current| match current {
            None => Ok(Plan::Skip {
                outcome: DeleteResult::NotFound,
            }),
            // Count 1 is deleted outright; a record never persists with 0
            Some(record) if record.reference_count < 2 => Ok(Plan::Delete {
                outcome: DeleteResult::Removed,
            }),
            Some(record) => {
                let count = record.reference_count - 1;
                Ok(Plan::Put {
                    count,
                    value: record.value.to_vec(),
                    outcome: DeleteResult::Decremented {
                        reference_count: count,
                    },
                })
            }
        })?;

        tracing::debug!(
            key = %hex::encode(key),
            count = result.reference_count(),
            removed = result.is_removed(),
            "delete_value"
        );
        Ok(result)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    pub fn handle(&self) -> &StoreHandle {
        &self.handle
    }

    /// Flush and release the store, keeping its data
    pub fn close(&mut self) -> Result<()> {
        self.handle.close()
    }

    /// Release the store and remove its data; idempotent
    pub fn close_and_destroy(&mut self) -> Result<()> {
        self.handle.close_and_destroy()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Run one read-modify-write cycle per attempt until it commits
    fn mutate<T, F>(&self, key: &[u8], mut plan: F) -> Result<T>
    where
        F: FnMut(Option<StoredRecord>) -> Result<Plan<T>>,
    {
        let retries = self.handle.config().max_commit_retries;
        let mut attempt = 0;

        loop {
            let mut txn = self.handle.begin_transaction()?;
            let current = match txn.get_for_update(key)? {
                Some(raw) => live_record(key, raw)?,
                None => None,
            };

            match Self::apply(&mut txn, key, plan(current)?)? {
                Applied::Skipped(outcome) => return Ok(outcome),
                Applied::Staged(outcome) => match txn.commit() {
                    Ok(()) => return Ok(outcome),
                    Err(RefKvError::Conflict { .. }) if attempt < retries => {
                        attempt += 1;
                        tracing::debug!(key = %hex::encode(key), attempt, "retrying after conflict");
                    }
                    Err(e) => return Err(e),
                },
            }
        }
    }

    fn apply<T>(txn: &mut Transaction<'_>, key: &[u8], plan: Plan<T>) -> Result<Applied<T>> {
        match plan {
            Plan::Put {
                count,
                value,
                outcome,
            } => {
                txn.put(key, &codec::encode(count, &value))?;
                Ok(Applied::Staged(outcome))
            }
            Plan::Delete { outcome } => {
                txn.delete(key)?;
                Ok(Applied::Staged(outcome))
            }
            Plan::Skip { outcome } => Ok(Applied::Skipped(outcome)),
        }
    }
}

enum Applied<T> {
    Staged(T),
    Skipped(T),
}

/// Decode a stored value; a zero count is treated as no record
fn live_record(key: &[u8], raw: Vec<u8>) -> Result<Option<StoredRecord>> {
    let record = codec::decode_owned(raw)?;
    if record.reference_count == 0 {
        tracing::warn!(key = %hex::encode(key), "ignoring persisted record with zero references");
        return Ok(None);
    }
    Ok(Some(record))
}

fn bump(key: &[u8], count: u32) -> Result<u32> {
    count
        .checked_add(1)
        .ok_or_else(|| RefKvError::CountOverflow { key: key.to_vec() })
}
