//! Result types returned by the reference store
//!
//! Absence is a variant, not an error: every operation returns
//! `Result<...>` where `Err` carries engine failures and contract
//! violations, and `Ok` carries one of the enums below.

use bytes::Bytes;

/// The persisted `(reference_count, value)` pair under one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub reference_count: u32,
    pub value: Bytes,
}

impl StoredRecord {
    pub fn new(reference_count: u32, value: impl Into<Bytes>) -> Self {
        Self {
            reference_count,
            value: value.into(),
        }
    }

    /// The decoded form of "no record": count 0, empty value
    pub fn absent() -> Self {
        Self::new(0, Bytes::new())
    }
}

/// Outcome class of a store operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    NotFound,
}

impl Status {
    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }
}

/// Result of `get_value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetResult {
    Found(StoredRecord),
    NotFound,
}

impl GetResult {
    pub fn status(&self) -> Status {
        match self {
            GetResult::Found(_) => Status::Ok,
            GetResult::NotFound => Status::NotFound,
        }
    }

    /// Current count; 0 when absent
    pub fn reference_count(&self) -> u32 {
        match self {
            GetResult::Found(record) => record.reference_count,
            GetResult::NotFound => 0,
        }
    }

    /// Stored value; empty when absent
    pub fn value(&self) -> &[u8] {
        match self {
            GetResult::Found(record) => record.value.as_ref(),
            GetResult::NotFound => &[],
        }
    }

    pub fn into_record(self) -> Option<StoredRecord> {
        match self {
            GetResult::Found(record) => Some(record),
            GetResult::NotFound => None,
        }
    }
}

/// Result of `save` and `increment_reference`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveResult {
    /// The record now holds `reference_count` references
    Saved { key: Vec<u8>, reference_count: u32 },
    /// `increment_reference` on a key with no record; nothing was created
    NotFound { key: Vec<u8> },
}

impl SaveResult {
    pub fn status(&self) -> Status {
        match self {
            SaveResult::Saved { .. } => Status::Ok,
            SaveResult::NotFound { .. } => Status::NotFound,
        }
    }

    pub fn reference_count(&self) -> u32 {
        match self {
            SaveResult::Saved {
                reference_count, ..
            } => *reference_count,
            SaveResult::NotFound { .. } => 0,
        }
    }

    pub fn key(&self) -> &[u8] {
        match self {
            SaveResult::Saved { key, .. } | SaveResult::NotFound { key } => key,
        }
    }
}

/// Result of `delete_value`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteResult {
    /// One reference released; `reference_count` remain
    Decremented { reference_count: u32 },
    /// The last reference was released and the record physically deleted
    Removed,
    /// No record under the key
    NotFound,
}

impl DeleteResult {
    pub fn status(&self) -> Status {
        match self {
            DeleteResult::Decremented { .. } | DeleteResult::Removed => Status::Ok,
            DeleteResult::NotFound => Status::NotFound,
        }
    }

    pub fn reference_count(&self) -> u32 {
        match self {
            DeleteResult::Decremented { reference_count } => *reference_count,
            DeleteResult::Removed | DeleteResult::NotFound => 0,
        }
    }

    pub fn is_removed(&self) -> bool {
        matches!(self, DeleteResult::Removed)
    }
}
