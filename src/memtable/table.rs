//! MemTable implementation
//!
//! BTreeMap-based memtable behind a single RwLock; the byte count lives under
//! the same lock so it never drifts from the map contents.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use super::MemTableEntry;

#[derive(Default)]
struct Inner {
    data: BTreeMap<Vec<u8>, MemTableEntry>,
    /// Sum of key lengths plus value lengths
    size: usize,
}

/// In-memory table for recent writes
#[derive(Default)]
pub struct MemTable {
    inner: RwLock<Inner>,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the entry for a key, if the memtable has one
    pub fn get(&self, key: &[u8]) -> Option<MemTableEntry> {
        self.inner.read().data.get(key).cloned()
    }

    /// Put a key-value pair, returning the new size in bytes
    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) -> usize {
        self.insert(key, MemTableEntry::Value(value))
    }

    /// Record a tombstone for a key, returning the new size in bytes
    pub fn delete(&self, key: Vec<u8>) -> usize {
        self.insert(key, MemTableEntry::Tombstone)
    }

    fn insert(&self, key: Vec<u8>, entry: MemTableEntry) -> usize {
        let mut inner = self.inner.write();
        let key_len = key.len();
        let added = entry.payload_len();

        match inner.data.insert(key, entry) {
            Some(previous) => {
                inner.size = inner.size - previous.payload_len() + added;
            }
            None => {
                inner.size += key_len + added;
            }
        }

        inner.size
    }

    /// Approximate size in bytes
    pub fn size(&self) -> usize {
        self.inner.read().size
    }

    /// Number of entries, tombstones included
    pub fn entry_count(&self) -> usize {
        self.inner.read().data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().data.is_empty()
    }

    /// Snapshot of all entries in sorted key order
    pub fn iter(&self) -> Vec<(Vec<u8>, MemTableEntry)> {
        self.inner
            .read()
            .data
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Clear all entries (after successful flush)
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.data.clear();
        inner.size = 0;
    }
}
