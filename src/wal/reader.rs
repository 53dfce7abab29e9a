//! WAL Reader
//!
//! Handles reading entries from the WAL file.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::error::{RefKvError, Result};

use super::entry::HEADER_SIZE;
use super::WalEntry;

/// Reads entries from the WAL file
///
/// A torn write at the tail (incomplete header or data) ends the stream with
/// `Ok(None)`; a complete entry with a bad CRC is an error.
pub struct WalReader {
    reader: BufReader<File>,
    /// Offset just past the last entry that decoded cleanly
    position: u64,
    /// Set when the stream ended on an incomplete entry
    partial_tail: bool,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
            partial_tail: false,
        })
    }

    /// Read the next entry from the WAL
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        if self.partial_tail {
            return Ok(None);
        }

        let mut header = [0u8; HEADER_SIZE];
        let read = self.fill(&mut header)?;
        if read == 0 {
            return Ok(None);
        }
        if read < HEADER_SIZE {
            self.partial_tail = true;
            return Ok(None);
        }

        let (lsn, crc, len) = WalEntry::parse_header(&header)?;

        let mut data = vec![0u8; len as usize];
        if self.fill(&mut data)? < data.len() {
            self.partial_tail = true;
            return Ok(None);
        }

        let entry = WalEntry::decode_body(lsn, crc, &data)?;
        self.position += (HEADER_SIZE + data.len()) as u64;

        Ok(Some(entry))
    }

    /// Iterate over all valid entries
    pub fn entries(self) -> WalIterator {
        WalIterator {
            reader: self,
            done: false,
        }
    }

    /// Byte offset just past the last cleanly decoded entry
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Whether reading stopped on a torn (incomplete) entry
    pub fn hit_partial_tail(&self) -> bool {
        self.partial_tail
    }

    /// Read until `buf` is full or EOF; returns the number of bytes read
    fn fill(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(RefKvError::Io(e)),
            }
        }
        Ok(filled)
    }
}

/// Iterator over WAL entries
///
/// Yields at most one error, then stops.
pub struct WalIterator {
    reader: WalReader,
    done: bool,
}

impl Iterator for WalIterator {
    type Item = Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
