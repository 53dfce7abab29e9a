//! Storage Module
//!
//! Persistent storage layer built from immutable SSTables.
//!
//! ## Responsibilities
//! - Persist flushed memtables to disk in sorted format
//! - Point lookups searching tables newest → oldest
//! - Discover existing tables when a store is reopened
//!
//! Tables are never merged; compaction is out of scope for this crate.

mod manager;
mod sstable;

pub use manager::StorageManager;
pub use sstable::{SSTable, SSTableBuilder, SSTableReader};
