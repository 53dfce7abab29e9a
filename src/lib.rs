//! # refkv
//!
//! A reference-counted, content-addressed value store with:
//! - One `(reference_count, value)` record per key
//! - Physical deletion when the last reference is released
//! - Write-Ahead Logging (WAL) for durability
//! - Crash recovery with partial write handling
//! - Optimistic single-key transactions, retried on conflict
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    RefCountedStore                           │
//! │      save / increment_reference / delete_value / get         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ read-modify-write, retry on Conflict
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                     StoreHandle                              │
//! │          (directory lock, close / close_and_destroy)         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Engine + Transaction                        │
//! │     (Single Writer / Multi Reader, validated commits)        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │     WAL     │          │  MemTable   │
//!   │  (Append)   │          │  (RwLock)   │
//!   └─────────────┘          └──────┬──────┘
//!                                   │
//!                                   ▼
//!                           ┌─────────────┐
//!                           │   Storage   │
//!                           │  (SSTable)  │
//!                           └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use refkv::{DeleteResult, RefCountedStore};
//!
//! # fn main() -> refkv::Result<()> {
//! let store = RefCountedStore::open("./refkv_data")?;
//!
//! store.save(b"h1", b"payload")?;
//! store.save(b"h1", b"payload")?;
//! assert_eq!(store.get_value(b"h1")?.reference_count(), 2);
//!
//! store.delete_value(b"h1")?;
//! assert_eq!(store.delete_value(b"h1")?, DeleteResult::Removed);
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod wal;
pub mod memtable;
pub mod storage;
pub mod engine;

pub mod codec;
pub mod types;
pub mod handle;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{RefKvError, Result};
pub use config::{Config, WalSyncStrategy};
pub use engine::{Engine, Transaction};
pub use handle::StoreHandle;
pub use store::RefCountedStore;
pub use types::{DeleteResult, GetResult, SaveResult, Status, StoredRecord};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of refkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
