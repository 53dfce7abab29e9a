//! WAL recovery: replay, tail truncation, verify-only scans

use std::fs::{self, OpenOptions};
use std::io::Write;

use refkv::config::WalSyncStrategy;
use refkv::wal::{WalRecovery, WalWriter, HEADER_SIZE};

use crate::{delete, put, setup_temp_wal};

#[test]
fn test_clean_log_recovers_everything() {
    let (_temp, wal_path) = setup_temp_wal();
    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        writer.append(&put("a", "1")).unwrap();
        writer.append(&delete("a")).unwrap();
        writer.append(&put("b", "2")).unwrap();
    }

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(result.entries_recovered, 3);
    assert_eq!(result.entries_corrupted, 0);
    assert_eq!(result.last_lsn, 3);
    assert!(!result.was_truncated);
}

#[test]
fn test_empty_log() {
    let (_temp, wal_path) = setup_temp_wal();
    fs::write(&wal_path, b"").unwrap();

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();
    assert!(entries.is_empty());
    assert_eq!(result.last_lsn, 0);
    assert!(!result.was_truncated);
}

#[test]
fn test_torn_tail_is_cut_off() {
    let (_temp, wal_path) = setup_temp_wal();
    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        writer.append(&put("a", "1")).unwrap();
        writer.append(&put("b", "2")).unwrap();
    }
    let clean_len = fs::metadata(&wal_path).unwrap().len();

    let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
    file.write_all(&[0xEE; 9]).unwrap();
    drop(file);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();
    assert_eq!(entries.len(), 2);
    assert!(result.was_truncated);
    assert_eq!(result.entries_corrupted, 0);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), clean_len);
}

#[test]
fn test_corruption_discards_everything_after() {
    let (_temp, wal_path) = setup_temp_wal();
    let first_len;
    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        writer.append(&put("a", "1")).unwrap();
        first_len = fs::metadata(&wal_path).unwrap().len();
        writer.append(&put("b", "2")).unwrap();
        writer.append(&put("c", "3")).unwrap();
    }

    let mut bytes = fs::read(&wal_path).unwrap();
    bytes[first_len as usize + HEADER_SIZE] ^= 0xFF;
    fs::write(&wal_path, &bytes).unwrap();

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(result.entries_corrupted, 1);
    assert_eq!(result.last_lsn, 1);
    assert!(result.was_truncated);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), first_len);
}

#[test]
fn test_verify_does_not_modify_file() {
    let (_temp, wal_path) = setup_temp_wal();
    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        writer.append(&put("a", "1")).unwrap();
    }
    let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
    file.write_all(&[0x00; 5]).unwrap();
    drop(file);
    let torn_len = fs::metadata(&wal_path).unwrap().len();

    let result = WalRecovery::verify(&wal_path).unwrap();
    assert_eq!(result.entries_recovered, 1);
    assert!(result.was_truncated);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), torn_len);
}

#[test]
fn test_writer_after_recovery_appends_cleanly() {
    let (_temp, wal_path) = setup_temp_wal();
    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        writer.append(&put("a", "1")).unwrap();
    }
    let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
    file.write_all(&[0xAA; 20]).unwrap();
    drop(file);

    WalRecovery::recover(&wal_path).unwrap();
    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        assert_eq!(writer.append(&put("b", "2")).unwrap(), 2);
    }

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();
    assert_eq!(entries.len(), 2);
    assert!(!result.was_truncated);
}
