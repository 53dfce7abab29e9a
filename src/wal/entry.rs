//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries and their byte format.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{RefKvError, Result};

/// Header size: LSN (8) + CRC (4) + Len (4) = 16 bytes
pub const HEADER_SIZE: usize = 16;

/// Largest payload a header may announce (256 MB)
pub const MAX_DATA_SIZE: u32 = 256 * 1024 * 1024;

/// A single entry in the WAL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The operation to perform
    pub operation: Operation,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,
}

/// Operations that can be logged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Put a key-value pair
    Put { key: Vec<u8>, value: Vec<u8> },

    /// Delete a key
    Delete { key: Vec<u8> },
}

impl Operation {
    /// The key this operation touches
    pub fn key(&self) -> &[u8] {
        match self {
            Operation::Put { key, .. } | Operation::Delete { key } => key,
        }
    }
}

impl WalEntry {
    /// Create an entry stamped with the current wall-clock time
    pub fn new(lsn: u64, operation: Operation) -> Self {
        Self {
            lsn,
            operation,
            timestamp: now_millis(),
        }
    }

    /// Serialize to `[lsn][crc][len][data]`
    pub fn serialize(&self) -> Result<Vec<u8>> {
        Self::encode(self.lsn, self.timestamp, &self.operation)
    }

    /// Deserialize a complete entry, verifying its CRC
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let (lsn, crc, len) = Self::parse_header(bytes)?;

        let end = HEADER_SIZE + len as usize;
        if bytes.len() < end {
            return Err(RefKvError::WalCorruption(format!(
                "truncated entry: expected {} data bytes, got {}",
                len,
                bytes.len() - HEADER_SIZE
            )));
        }

        Self::decode_body(lsn, crc, &bytes[HEADER_SIZE..end])
    }

    /// Total on-disk size of this entry
    pub fn serialized_size(&self) -> Result<usize> {
        Ok(HEADER_SIZE + Self::encode_data(self.timestamp, &self.operation)?.len())
    }

    /// CRC32 over the LSN and the encoded payload
    pub fn compute_crc(&self) -> Result<u32> {
        let data = Self::encode_data(self.timestamp, &self.operation)?;
        Ok(Self::checksum(self.lsn, &data))
    }

    // =========================================================================
    // Crate-internal helpers (shared with the reader)
    // =========================================================================

    /// Encode an entry without taking ownership of its operation
    pub(crate) fn encode(lsn: u64, timestamp: u64, operation: &Operation) -> Result<Vec<u8>> {
        let data = Self::encode_data(timestamp, operation)?;
        if data.len() > MAX_DATA_SIZE as usize {
            return Err(RefKvError::WalWrite(format!(
                "entry of {} bytes exceeds maximum {}",
                data.len(),
                MAX_DATA_SIZE
            )));
        }
        let crc = Self::checksum(lsn, &data);

        let mut bytes = Vec::with_capacity(HEADER_SIZE + data.len());
        bytes.extend_from_slice(&lsn.to_le_bytes());
        bytes.extend_from_slice(&crc.to_le_bytes());
        bytes.extend_from_slice(&(data.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&data);

        Ok(bytes)
    }

    /// Split a header into (lsn, crc, data_len)
    pub(crate) fn parse_header(bytes: &[u8]) -> Result<(u64, u32, u32)> {
        if bytes.len() < HEADER_SIZE {
            return Err(RefKvError::WalCorruption(format!(
                "incomplete header: expected {} bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }

        let mut lsn = [0u8; 8];
        lsn.copy_from_slice(&bytes[0..8]);
        let mut crc = [0u8; 4];
        crc.copy_from_slice(&bytes[8..12]);
        let mut len = [0u8; 4];
        len.copy_from_slice(&bytes[12..16]);

        let len = u32::from_le_bytes(len);
        if len > MAX_DATA_SIZE {
            return Err(RefKvError::WalCorruption(format!(
                "entry length {} exceeds maximum {}",
                len, MAX_DATA_SIZE
            )));
        }

        Ok((u64::from_le_bytes(lsn), u32::from_le_bytes(crc), len))
    }

    /// Verify the CRC and decode the payload
    pub(crate) fn decode_body(lsn: u64, crc: u32, data: &[u8]) -> Result<Self> {
        let actual = Self::checksum(lsn, data);
        if actual != crc {
            return Err(RefKvError::WalCorruption(format!(
                "CRC mismatch at lsn {}: stored {:#010x}, computed {:#010x}",
                lsn, crc, actual
            )));
        }

        let (operation, timestamp): (Operation, u64) = bincode::deserialize(data)
            .map_err(|e| RefKvError::Serialization(e.to_string()))?;

        Ok(Self {
            lsn,
            operation,
            timestamp,
        })
    }

    fn encode_data(timestamp: u64, operation: &Operation) -> Result<Vec<u8>> {
        bincode::serialize(&(operation, timestamp))
            .map_err(|e| RefKvError::Serialization(e.to_string()))
    }

    fn checksum(lsn: u64, data: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&lsn.to_le_bytes());
        hasher.update(data);
        hasher.finalize()
    }
}

/// Wall-clock unix millis; 0 if the clock is before the epoch
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
