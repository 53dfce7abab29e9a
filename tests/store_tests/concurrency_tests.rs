//! Concurrent reference counting
//!
//! Many threads hammering the same keys must not lose updates: the final
//! count equals the number of successful saves minus successful deletes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use refkv::{Config, DeleteResult, GetResult, RefCountedStore, RefKvError, WalSyncStrategy};
use tempfile::TempDir;

const THREADS: usize = 8;
const OPS_PER_THREAD: usize = 50;

fn shared_store(temp_dir: &TempDir) -> Arc<RefCountedStore> {
    crate::init_tracing();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .wal_sync_strategy(WalSyncStrategy::EveryNEntries { count: 64 })
        .memtable_size_limit(8 * 1024)
        .max_commit_retries(u32::MAX)
        .build();
    Arc::new(RefCountedStore::open_with(config).unwrap())
}

#[test]
fn test_concurrent_saves_on_one_key() {
    let temp_dir = TempDir::new().unwrap();
    let store = shared_store(&temp_dir);
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..OPS_PER_THREAD {
                    store.save(b"hot", b"shared content").unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let result = store.get_value(b"hot").unwrap();
    assert_eq!(result.reference_count() as usize, THREADS * OPS_PER_THREAD);
    assert_eq!(result.value(), b"shared content");
}

#[test]
fn test_concurrent_saves_and_deletes_balance_out() {
    let temp_dir = TempDir::new().unwrap();
    let store = shared_store(&temp_dir);

    // Base reference keeps the record alive while others come and go
    store.save(b"k", b"v").unwrap();

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..OPS_PER_THREAD {
                    if (t + i) % 2 == 0 {
                        store.save(b"k", b"v").unwrap();
                        store.delete_value(b"k").unwrap();
                    } else {
                        store.increment_reference(b"k").unwrap();
                        store.delete_value(b"k").unwrap();
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.get_value(b"k").unwrap().reference_count(), 1);
    assert_eq!(store.delete_value(b"k").unwrap(), DeleteResult::Removed);
    assert_eq!(store.get_value(b"k").unwrap(), GetResult::NotFound);
}

#[test]
fn test_concurrent_writers_on_many_keys() {
    let temp_dir = TempDir::new().unwrap();
    let store = shared_store(&temp_dir);
    let keys: Vec<Vec<u8>> = (0..16u8).map(|i| vec![b'k', i]).collect();
    let keys = Arc::new(keys);

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let store = Arc::clone(&store);
            let keys = Arc::clone(&keys);
            thread::spawn(move || {
                for i in 0..OPS_PER_THREAD {
                    let key = &keys[(t + i) % keys.len()];
                    store.save(key, key).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let total: usize = keys
        .iter()
        .map(|key| {
            let result = store.get_value(key).unwrap();
            assert_eq!(result.value(), key.as_slice());
            result.reference_count() as usize
        })
        .sum();
    assert_eq!(total, THREADS * OPS_PER_THREAD);
}

#[test]
fn test_exhausted_retries_surface_conflict_without_writing() {
    crate::init_tracing();
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .wal_sync_strategy(WalSyncStrategy::EveryNEntries { count: 64 })
        .max_commit_retries(0)
        .build();
    let store = Arc::new(RefCountedStore::open_with(config).unwrap());
    let saved = Arc::new(AtomicUsize::new(0));
    let conflicts = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let store = Arc::clone(&store);
            let saved = Arc::clone(&saved);
            let conflicts = Arc::clone(&conflicts);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..OPS_PER_THREAD {
                    match store.save(b"contended", b"v") {
                        Ok(_) => {
                            saved.fetch_add(1, Ordering::SeqCst);
                        }
                        Err(RefKvError::Conflict { key }) => {
                            assert_eq!(key, b"contended");
                            conflicts.fetch_add(1, Ordering::SeqCst);
                        }
                        Err(e) => panic!("unexpected error: {}", e),
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let saved = saved.load(Ordering::SeqCst);
    assert!(saved > 0);
    assert_eq!(saved + conflicts.load(Ordering::SeqCst), THREADS * OPS_PER_THREAD);
    assert_eq!(
        store.get_value(b"contended").unwrap().reference_count() as usize,
        saved
    );
}
