//! SSTable Reader
//!
//! Opens SSTable files and provides O(log n) key lookups via an in-memory
//! index. The file handle sits behind a mutex so lookups take `&self` and the
//! storage manager can serve them under a shared lock.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{RefKvError, Result};
use crate::memtable::MemTableEntry;

use super::{read_u32, read_u64, FOOTER_SIZE, HEADER_SIZE, MAGIC, TOMBSTONE_MARKER, VERSION};

/// Reader for SSTable files with in-memory index for O(log n) lookups
pub struct SSTableReader {
    path: PathBuf,
    file: Mutex<BufReader<File>>,
    /// key → file offset of entry
    index: BTreeMap<Vec<u8>, u64>,
    entry_count: u64,
}

impl SSTableReader {
    /// Open an SSTable, validating header, footer, data CRC and index
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let file_size = file.metadata()?.len();

        if file_size < HEADER_SIZE + FOOTER_SIZE {
            return Err(corrupt(path, format!("file too small ({} bytes)", file_size)));
        }

        let mut header = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut header)?;

        if &header[0..4] != MAGIC {
            return Err(corrupt(path, format!("invalid magic {:?}", &header[0..4])));
        }

        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != VERSION {
            return Err(corrupt(path, format!("unsupported version {}", version)));
        }

        let entry_count = read_u64(&header, 6);

        file.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))?;
        let mut footer = [0u8; FOOTER_SIZE as usize];
        file.read_exact(&mut footer)?;

        let index_offset = read_u64(&footer, 0);
        let data_crc = read_u32(&footer, 8);

        if index_offset < HEADER_SIZE || index_offset > file_size - FOOTER_SIZE {
            return Err(corrupt(path, format!("index offset {} out of bounds", index_offset)));
        }

        // Data block checksum
        file.seek(SeekFrom::Start(HEADER_SIZE))?;
        let mut data = vec![0u8; (index_offset - HEADER_SIZE) as usize];
        file.read_exact(&mut data)?;
        let actual_crc = crc32fast::hash(&data);
        if actual_crc != data_crc {
            return Err(corrupt(
                path,
                format!("data CRC mismatch: stored {:#010x}, computed {:#010x}", data_crc, actual_crc),
            ));
        }

        // Index block: [key_len(4)][offset(8)][key]
        let mut index_data = vec![0u8; (file_size - FOOTER_SIZE - index_offset) as usize];
        file.read_exact(&mut index_data)?;

        let mut index = BTreeMap::new();
        let mut pos = 0;
        while pos < index_data.len() {
            if pos + 12 > index_data.len() {
                return Err(corrupt(path, "truncated index entry".to_string()));
            }
            let key_len = read_u32(&index_data, pos) as usize;
            let offset = read_u64(&index_data, pos + 4);
            pos += 12;

            if pos + key_len > index_data.len() || offset >= index_offset {
                return Err(corrupt(path, "index entry out of bounds".to_string()));
            }
            index.insert(index_data[pos..pos + key_len].to_vec(), offset);
            pos += key_len;
        }

        if index.len() as u64 != entry_count {
            return Err(corrupt(
                path,
                format!("header claims {} entries, index has {}", entry_count, index.len()),
            ));
        }

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(BufReader::new(file)),
            index,
            entry_count,
        })
    }

    /// Look a key up in this table
    ///
    /// Returns:
    /// - `Ok(Some(Value(v)))`: key has a value here
    /// - `Ok(Some(Tombstone))`: key was deleted as of this table
    /// - `Ok(None)`: key not in this table
    pub fn get(&self, key: &[u8]) -> Result<Option<MemTableEntry>> {
        let offset = match self.index.get(key) {
            Some(&off) => off,
            None => return Ok(None),
        };

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;

        let mut header = [0u8; 8];
        file.read_exact(&mut header)?;
        let key_len = read_u32(&header, 0);
        let val_len = read_u32(&header, 4);

        file.seek(SeekFrom::Current(key_len as i64))?;

        if val_len == TOMBSTONE_MARKER {
            return Ok(Some(MemTableEntry::Tombstone));
        }

        let mut value = vec![0u8; val_len as usize];
        file.read_exact(&mut value)?;

        Ok(Some(MemTableEntry::Value(value)))
    }

    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn min_key(&self) -> Option<&[u8]> {
        self.index.keys().next().map(|k| k.as_slice())
    }

    pub fn max_key(&self) -> Option<&[u8]> {
        self.index.keys().next_back().map(|k| k.as_slice())
    }

    /// Returns false only if the key is definitely outside [min_key, max_key]
    pub fn might_contain(&self, key: &[u8]) -> bool {
        match (self.min_key(), self.max_key()) {
            (Some(min), Some(max)) => key >= min && key <= max,
            _ => false,
        }
    }
}

fn corrupt(path: &Path, reason: String) -> RefKvError {
    RefKvError::Storage(format!("corrupt SSTable {}: {}", path.display(), reason))
}
