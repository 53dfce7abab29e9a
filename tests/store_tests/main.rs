//! Reference store test suite

mod concurrency_tests;
mod handle_tests;

use refkv::{Config, RefCountedStore, WalSyncStrategy};
use tempfile::TempDir;
use tracing_subscriber::{fmt, EnvFilter};

/// Route store logs to the test harness; `RUST_LOG=refkv=debug` to see them
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .with_thread_ids(true)
        .try_init();
}

pub fn config_for(dir: &TempDir) -> Config {
    init_tracing();
    Config::builder()
        .data_dir(dir.path().join("store"))
        .wal_sync_strategy(WalSyncStrategy::EveryWrite)
        .build()
}

pub fn setup_temp_store() -> (TempDir, RefCountedStore) {
    let temp_dir = TempDir::new().unwrap();
    let store = RefCountedStore::open_with(config_for(&temp_dir)).unwrap();
    (temp_dir, store)
}
