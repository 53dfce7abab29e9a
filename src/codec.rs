//! Record codec
//!
//! Maps a [`StoredRecord`] to and from the raw value the engine stores:
//!
//! ```text
//! ┌──────────────────────┬──────────────────────────────┐
//! │ Count: u32 (4, ne)   │ Value (remainder of record)  │
//! └──────────────────────┴──────────────────────────────┘
//! ```
//!
//! The count is native-endian. An empty buffer decodes to `(0, empty)`,
//! meaning "no record"; this is unambiguous only because a record with zero
//! references is deleted rather than persisted.

use bytes::Bytes;

use crate::error::{RefKvError, Result};
use crate::types::StoredRecord;

/// Width of the encoded reference count
pub const COUNT_WIDTH: usize = std::mem::size_of::<u32>();

/// Encode `count ++ value`
pub fn encode(count: u32, value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(COUNT_WIDTH + value.len());
    out.extend_from_slice(&count.to_ne_bytes());
    out.extend_from_slice(value);
    out
}

/// Decode a borrowed buffer, copying the value out
pub fn decode(raw: &[u8]) -> Result<StoredRecord> {
    let count = decode_count(raw)?;
    if raw.is_empty() {
        return Ok(StoredRecord::absent());
    }
    Ok(StoredRecord::new(count, Bytes::copy_from_slice(&raw[COUNT_WIDTH..])))
}

/// Decode an owned buffer; the value shares its allocation
pub fn decode_owned(raw: Vec<u8>) -> Result<StoredRecord> {
    let count = decode_count(&raw)?;
    if raw.is_empty() {
        return Ok(StoredRecord::absent());
    }
    Ok(StoredRecord::new(count, Bytes::from(raw).slice(COUNT_WIDTH..)))
}

fn decode_count(raw: &[u8]) -> Result<u32> {
    if raw.is_empty() {
        return Ok(0);
    }

    let prefix: [u8; COUNT_WIDTH] = raw
        .get(..COUNT_WIDTH)
        .and_then(|p| p.try_into().ok())
        .ok_or_else(|| {
            RefKvError::Decode(format!(
                "record of {} bytes is shorter than the {}-byte count",
                raw.len(),
                COUNT_WIDTH
            ))
        })?;

    Ok(u32::from_ne_bytes(prefix))
}
