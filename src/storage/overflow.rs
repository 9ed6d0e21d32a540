//! Overflow stores
//!
//! Values that cannot be inlined into a record live in one of two
//! append-only stores: `txt` for document and text-like content, `atv` for
//! attribute values. An entry is a compact length followed by raw bytes and
//! is addressed by the byte offset at which it was appended.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use super::errors::{StorageError, StorageResult};
use super::layout::Stream;
use super::num;
use super::stream::DataOutput;

/// Append side of an overflow store
pub struct OverflowWriter {
    out: DataOutput,
}

impl OverflowWriter {
    pub fn create(path: &Path, stream: Stream, buffer_size: usize) -> StorageResult<Self> {
        Ok(Self {
            out: DataOutput::create(path, stream, buffer_size)?,
        })
    }

    /// Appends an entry and returns the offset it starts at.
    pub fn append(&mut self, bytes: &[u8]) -> StorageResult<u64> {
        let offset = self.out.written();
        self.out.write_entry(bytes)?;
        Ok(offset)
    }

    /// Current store length in bytes.
    pub fn len(&self) -> u64 {
        self.out.written()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn close(self, sync: bool) -> StorageResult<()> {
        self.out.close(sync)
    }
}

/// Read side of an overflow store
pub struct OverflowReader {
    stream: Stream,
    file: File,
    len: u64,
}

impl OverflowReader {
    pub fn open(path: &Path, stream: Stream) -> StorageResult<Self> {
        let file = File::open(path).map_err(|e| StorageError::read_failed(stream, "open", e))?;
        let len = file
            .metadata()
            .map_err(|e| StorageError::read_failed(stream, "read metadata", e))?
            .len();
        Ok(Self { stream, file, len })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reads the entry starting at `offset`.
    pub fn read(&mut self, offset: u64) -> StorageResult<Vec<u8>> {
        if offset >= self.len {
            return Err(StorageError::data_corruption(
                self.stream,
                format!("offset {} past store end {}", offset, self.len),
            ));
        }
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| StorageError::read_failed(self.stream, "seek", e))?;

        let mut prefix = [0u8; 5];
        self.file
            .read_exact(&mut prefix[..1])
            .map_err(|e| StorageError::read_failed(self.stream, "read entry length", e))?;
        let width = num::width(prefix[0]);
        self.file
            .read_exact(&mut prefix[1..width])
            .map_err(|e| StorageError::read_failed(self.stream, "read entry length", e))?;
        let (len, _) = num::decode(&prefix[..width])
            .ok_or_else(|| StorageError::data_corruption(self.stream, "truncated entry length"))?;

        if offset + width as u64 + len as u64 > self.len {
            return Err(StorageError::data_corruption(
                self.stream,
                format!("entry at {} runs past store end", offset),
            ));
        }
        let mut bytes = vec![0u8; len as usize];
        self.file
            .read_exact(&mut bytes)
            .map_err(|e| StorageError::read_failed(self.stream, "read entry", e))?;
        Ok(bytes)
    }
}
