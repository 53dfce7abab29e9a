//! WAL test suite

mod recovery_tests;

use std::path::PathBuf;

use refkv::wal::Operation;
use tempfile::TempDir;

pub fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("test.wal");
    (temp_dir, wal_path)
}

pub fn put(key: &str, value: &str) -> Operation {
    Operation::Put {
        key: key.as_bytes().to_vec(),
        value: value.as_bytes().to_vec(),
    }
}

pub fn delete(key: &str) -> Operation {
    Operation::Delete {
        key: key.as_bytes().to_vec(),
    }
}
