//! Handle lifecycle
//!
//! These tests verify:
//! - Open failures are reported as `Open` with the cause attached
//! - A directory can only be held by one handle at a time
//! - close / close_and_destroy are idempotent
//! - destroy_on_drop removes the directory
//! - teardown only deletes files the store created

use std::fs;

use refkv::{Config, RefCountedStore, RefKvError, StoreHandle};
use tempfile::TempDir;

use crate::{config_for, setup_temp_store};

#[test]
fn test_open_creates_directory() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("store");

    let handle = StoreHandle::open(&path).unwrap();
    assert!(handle.is_open());
    assert!(path.is_dir());
    assert!(path.join("LOCK").exists());
    assert_eq!(handle.data_dir(), path.as_path());
}

#[test]
fn test_open_on_a_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("not_a_dir");
    fs::write(&path, b"occupied").unwrap();

    match RefCountedStore::open(&path) {
        Err(RefKvError::Open { path: reported, .. }) => assert_eq!(reported, path),
        Err(other) => panic!("expected Open error, got {}", other),
        Ok(_) => panic!("open on a regular file succeeded"),
    }
}

#[test]
fn test_open_with_invalid_config_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .memtable_size_limit(0)
        .build();

    match StoreHandle::open_with(config) {
        Err(RefKvError::Open { source, .. }) => {
            assert!(matches!(*source, RefKvError::Config(_)))
        }
        Err(other) => panic!("expected Open error, got {}", other),
        Ok(_) => panic!("invalid config accepted"),
    }
}

#[test]
fn test_second_handle_on_same_directory_is_locked() {
    let temp_dir = TempDir::new().unwrap();
    let _first = StoreHandle::open_with(config_for(&temp_dir)).unwrap();

    match StoreHandle::open_with(config_for(&temp_dir)) {
        Err(RefKvError::Open { source, .. }) => assert!(matches!(*source, RefKvError::Locked)),
        Err(other) => panic!("expected Locked, got {}", other),
        Ok(_) => panic!("second handle acquired a held directory"),
    }
}

#[test]
fn test_close_releases_directory() {
    let temp_dir = TempDir::new().unwrap();
    let mut first = RefCountedStore::open_with(config_for(&temp_dir)).unwrap();
    first.save(b"k", b"v").unwrap();
    first.close().unwrap();

    let second = RefCountedStore::open_with(config_for(&temp_dir)).unwrap();
    assert_eq!(second.get_value(b"k").unwrap().reference_count(), 1);
}

#[test]
fn test_operations_after_close_fail() {
    let (_temp, mut store) = setup_temp_store();
    store.close().unwrap();
    store.close().unwrap();

    assert!(!store.handle().is_open());
    assert!(matches!(store.get_value(b"k"), Err(RefKvError::Closed)));
    assert!(matches!(store.save(b"k", b"v"), Err(RefKvError::Closed)));
    assert!(matches!(store.delete_value(b"k"), Err(RefKvError::Closed)));
    assert!(matches!(store.increment_reference(b"k"), Err(RefKvError::Closed)));
}

#[test]
fn test_close_and_destroy_removes_directory() {
    let (temp_dir, mut store) = setup_temp_store();
    let path = config_for(&temp_dir).data_dir;
    store.save(b"k", b"v").unwrap();

    store.close_and_destroy().unwrap();
    assert!(!path.exists());
    assert!(matches!(store.get_value(b"k"), Err(RefKvError::Closed)));

    // Repeated teardown is a no-op
    store.close_and_destroy().unwrap();
    store.close().unwrap();
}

#[test]
fn test_close_and_destroy_tolerates_missing_directory() {
    let (temp_dir, mut store) = setup_temp_store();
    let path = config_for(&temp_dir).data_dir;

    fs::remove_dir_all(&path).unwrap();
    store.close_and_destroy().unwrap();
    assert!(!path.exists());
}

#[test]
fn test_close_and_destroy_keeps_foreign_files() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().to_path_buf();
    let notes = path.join("user_notes.txt");
    fs::write(&notes, b"not ours").unwrap();

    let mut store = RefCountedStore::open(&path).unwrap();
    store.save(b"k", b"v").unwrap();
    store.handle().engine().unwrap().flush().unwrap();
    store.close_and_destroy().unwrap();

    assert_eq!(fs::read(&notes).unwrap(), b"not ours");
    assert!(path.is_dir());
    assert!(!path.join("LOCK").exists());
    assert!(!path.join("wal.log").exists());
    assert!(!path.join("sstables").exists());
}

#[test]
fn test_close_and_destroy_removes_unfinished_files() {
    let (temp_dir, mut store) = setup_temp_store();
    let path = config_for(&temp_dir).data_dir;
    fs::write(path.join("wal.tmp"), b"partial").unwrap();
    fs::write(path.join("sstables").join("sstable_000007.tmp"), b"partial").unwrap();

    store.close_and_destroy().unwrap();
    assert!(!path.exists());
}

#[test]
fn test_directory_reusable_after_destroy_with_foreign_files() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().to_path_buf();
    fs::write(path.join("keep.me"), b"x").unwrap();

    {
        let mut store = RefCountedStore::open(&path).unwrap();
        store.save(b"k", b"v").unwrap();
        store.close_and_destroy().unwrap();
    }

    let store = RefCountedStore::open(&path).unwrap();
    assert!(!store.get_value(b"k").unwrap().status().is_ok());
    assert!(path.join("keep.me").exists());
}

#[test]
fn test_destroy_on_drop_keeps_foreign_files() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().to_path_buf();
    fs::write(path.join("keep.me"), b"x").unwrap();
    let config = Config::builder()
        .data_dir(&path)
        .destroy_on_drop(true)
        .build();

    {
        let store = RefCountedStore::open_with(config).unwrap();
        store.save(b"k", b"v").unwrap();
    }

    assert!(path.join("keep.me").exists());
    assert!(!path.join("wal.log").exists());
}

#[test]
fn test_reopen_after_destroy_is_empty() {
    let temp_dir = TempDir::new().unwrap();
    {
        let mut store = RefCountedStore::open_with(config_for(&temp_dir)).unwrap();
        store.save(b"k", b"v").unwrap();
        store.close_and_destroy().unwrap();
    }

    let store = RefCountedStore::open_with(config_for(&temp_dir)).unwrap();
    assert!(!store.get_value(b"k").unwrap().status().is_ok());
}

#[test]
fn test_destroy_on_drop() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("scratch");
    let config = Config::builder()
        .data_dir(&path)
        .destroy_on_drop(true)
        .build();

    {
        let store = RefCountedStore::open_with(config).unwrap();
        store.save(b"k", b"v").unwrap();
        assert!(path.exists());
    }

    assert!(!path.exists());
}

#[test]
fn test_drop_keeps_data_by_default() {
    let temp_dir = TempDir::new().unwrap();
    let path = config_for(&temp_dir).data_dir;
    drop(RefCountedStore::open_with(config_for(&temp_dir)).unwrap());

    assert!(path.join("wal.log").exists());
    assert!(path.join("sstables").is_dir());
}
