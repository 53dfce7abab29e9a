//! Error types for refkv
//!
//! Provides a unified error type for all operations. A missing key is never
//! an error here: lookups report absence through `Option` or through the
//! `NotFound` variants of the store's result types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using RefKvError
pub type Result<T> = std::result::Result<T, RefKvError>;

/// Unified error type for refkv operations
#[derive(Debug, Error)]
pub enum RefKvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    #[error("WAL write failed: {0}")]
    WalWrite(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Record Errors
    // -------------------------------------------------------------------------
    #[error("Record decode error: {0}")]
    Decode(String),

    #[error("Value mismatch for key {}: stored value differs from the one being saved", hex::encode(.key))]
    ValueMismatch { key: Vec<u8> },

    #[error("Reference count overflow for key {}", hex::encode(.key))]
    CountOverflow { key: Vec<u8> },

    // -------------------------------------------------------------------------
    // Handle / Transaction Errors
    // -------------------------------------------------------------------------
    #[error("Failed to open store at {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: Box<RefKvError>,
    },

    #[error("Store directory is locked by another handle")]
    Locked,

    #[error("Store handle is closed")]
    Closed,

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Write conflict on key {}", hex::encode(.key))]
    Conflict { key: Vec<u8> },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RefKvError {
    /// True for failures raised by the storage engine itself (I/O, corruption,
    /// serialization). These are reported to callers and never retried.
    pub fn is_engine_error(&self) -> bool {
        matches!(
            self,
            RefKvError::Io(_)
                | RefKvError::WalCorruption(_)
                | RefKvError::WalWrite(_)
                | RefKvError::Storage(_)
                | RefKvError::Serialization(_)
        )
    }

    /// True when the error signals a caller contract violation rather than a
    /// storage fault.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, RefKvError::ValueMismatch { .. })
    }

    pub(crate) fn open(path: impl Into<PathBuf>, source: RefKvError) -> Self {
        RefKvError::Open {
            path: path.into(),
            source: Box::new(source),
        }
    }
}
