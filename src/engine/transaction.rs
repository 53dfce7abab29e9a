//! Single-key transactions
//!
//! A transaction stages at most one mutation (put or delete) and commits it
//! as a single WAL entry. It may also track one read with
//! [`Transaction::get_for_update`]; the commit is then rejected with
//! `RefKvError::Conflict` if that key's committed value changed after the
//! read. Dropping a transaction without committing writes nothing.

use crate::error::{RefKvError, Result};
use crate::wal::Operation;

use super::Engine;

/// A read recorded for commit-time validation
struct TrackedRead {
    key: Vec<u8>,
    observed: Option<Vec<u8>>,
}

/// Single-key transaction bound to an [`Engine`]
pub struct Transaction<'e> {
    engine: &'e Engine,
    read: Option<TrackedRead>,
    mutation: Option<Operation>,
}

impl<'e> Transaction<'e> {
    pub(super) fn new(engine: &'e Engine) -> Self {
        Self {
            engine,
            read: None,
            mutation: None,
        }
    }

    /// Read the latest committed value without tracking it
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.engine.get(key)
    }

    /// Read a key and make the commit conditional on it staying unchanged
    ///
    /// Only one key can be tracked. Reading the tracked key again returns the
    /// value observed the first time.
    pub fn get_for_update(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Some(read) = &self.read {
            if read.key != key {
                return Err(RefKvError::Transaction(format!(
                    "transaction already tracks key {}",
                    hex::encode(&read.key)
                )));
            }
            return Ok(read.observed.clone());
        }

        let observed = self.engine.get(key)?;
        self.read = Some(TrackedRead {
            key: key.to_vec(),
            observed: observed.clone(),
        });
        Ok(observed)
    }

    /// Stage a put
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.stage(Operation::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        })
    }

    /// Stage a delete
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.stage(Operation::Delete { key: key.to_vec() })
    }

    fn stage(&mut self, operation: Operation) -> Result<()> {
        if self.mutation.is_some() {
            return Err(RefKvError::Transaction(
                "a mutation is already staged in this transaction".to_string(),
            ));
        }

        if let Some(read) = &self.read {
            if read.key != operation.key() {
                return Err(RefKvError::Transaction(format!(
                    "mutation key {} differs from tracked key {}",
                    hex::encode(operation.key()),
                    hex::encode(&read.key)
                )));
            }
        }

        self.mutation = Some(operation);
        Ok(())
    }

    /// Whether a mutation has been staged
    pub fn has_mutation(&self) -> bool {
        self.mutation.is_some()
    }

    /// Commit the staged mutation
    ///
    /// A transaction with nothing staged commits trivially.
    pub fn commit(self) -> Result<()> {
        let Some(operation) = self.mutation else {
            return Ok(());
        };

        let expected = self
            .read
            .as_ref()
            .map(|read| (read.key.as_slice(), &read.observed));

        let lsn = self.engine.commit(operation, expected)?;
        tracing::trace!(lsn, "transaction committed");
        Ok(())
    }

    /// Abandon the transaction; equivalent to dropping it
    pub fn rollback(self) {}
}
