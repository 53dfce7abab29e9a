//! MemTable Module
//!
//! In-memory table holding writes committed since the last flush.
//!
//! Committed transactions land here after their WAL entry is written. Reads
//! consult the memtable before any SSTable, so a tombstone here hides older
//! values on disk.

mod table;

pub use table::MemTable;

/// Entry stored in the MemTable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemTableEntry {
    /// A live value
    Value(Vec<u8>),

    /// A tombstone (deleted key)
    Tombstone,
}

impl MemTableEntry {
    /// Approximate footprint of the payload (tombstones carry none)
    pub(crate) fn payload_len(&self) -> usize {
        match self {
            MemTableEntry::Value(v) => v.len(),
            MemTableEntry::Tombstone => 0,
        }
    }
}
