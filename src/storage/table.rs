//! Fixed-record node table
//!
//! `TableOutput` appends records during a build. `TableAccess` opens the
//! finished file for random access by rank: reading whole records, reading
//! only the kind tag, and overwriting bytes at a record-relative offset.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use super::errors::{StorageError, StorageResult};
use super::layout::Stream;
use super::record::{NodeKind, NodeRecord, RECORD_SIZE};
use super::stream::DataOutput;

/// Append-only table writer
pub struct TableOutput {
    out: DataOutput,
    records: u32,
}

impl TableOutput {
    pub fn create(path: &Path, buffer_size: usize) -> StorageResult<Self> {
        Ok(Self {
            out: DataOutput::create(path, Stream::Table, buffer_size)?,
            records: 0,
        })
    }

    /// Number of records appended so far.
    pub fn records(&self) -> u32 {
        self.records
    }

    pub fn append(&mut self, record: &NodeRecord) -> StorageResult<()> {
        self.out.write_raw(&record.encode())?;
        self.records += 1;
        Ok(())
    }

    pub fn close(self) -> StorageResult<()> {
        self.out.close(false)
    }
}

/// Random-access view of a table file
pub struct TableAccess {
    file: File,
    records: u32,
    writable: bool,
}

impl TableAccess {
    /// Opens a table for reading and patching.
    pub fn open_rw(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| StorageError::read_failed(Stream::Table, "open for patching", e))?;
        Self::from_file(file, true)
    }

    /// Opens a table read-only.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = File::open(path)
            .map_err(|e| StorageError::read_failed(Stream::Table, "open", e))?;
        Self::from_file(file, false)
    }

    fn from_file(file: File, writable: bool) -> StorageResult<Self> {
        let len = file
            .metadata()
            .map_err(|e| StorageError::read_failed(Stream::Table, "read metadata", e))?
            .len();

        if len % RECORD_SIZE as u64 != 0 {
            return Err(StorageError::data_corruption(
                Stream::Table,
                format!("table length {} is not a multiple of {}", len, RECORD_SIZE),
            ));
        }
        let records = u32::try_from(len / RECORD_SIZE as u64).map_err(|_| {
            StorageError::data_corruption(Stream::Table, "table holds more records than ranks")
        })?;

        Ok(Self {
            file,
            records,
            writable,
        })
    }

    pub fn records(&self) -> u32 {
        self.records
    }

    fn seek_to(&mut self, rank: u32, offset: usize, width: usize) -> StorageResult<()> {
        if rank >= self.records || offset + width > RECORD_SIZE {
            return Err(StorageError::corruption_at_rank(
                Stream::Table,
                rank,
                format!(
                    "access past table end ({} records, offset {}, width {})",
                    self.records, offset, width
                ),
            ));
        }
        let pos = rank as u64 * RECORD_SIZE as u64 + offset as u64;
        self.file
            .seek(SeekFrom::Start(pos))
            .map_err(|e| StorageError::read_failed(Stream::Table, "seek", e))?;
        Ok(())
    }

    /// Reads the kind tag without decoding the rest of the record.
    pub fn kind(&mut self, rank: u32) -> StorageResult<NodeKind> {
        self.seek_to(rank, 0, 1)?;
        let mut tag = [0u8; 1];
        self.file
            .read_exact(&mut tag)
            .map_err(|e| StorageError::read_failed(Stream::Table, "read kind", e))?;
        NodeKind::from_tag(tag[0]).ok_or_else(|| {
            StorageError::corruption_at_rank(
                Stream::Table,
                rank,
                format!("unknown kind tag 0x{:02x}", tag[0]),
            )
        })
    }

    pub fn read_raw(&mut self, rank: u32) -> StorageResult<[u8; RECORD_SIZE]> {
        self.seek_to(rank, 0, RECORD_SIZE)?;
        let mut buf = [0u8; RECORD_SIZE];
        self.file
            .read_exact(&mut buf)
            .map_err(|e| StorageError::read_failed(Stream::Table, "read record", e))?;
        Ok(buf)
    }

    pub fn read(&mut self, rank: u32) -> StorageResult<NodeRecord> {
        let raw = self.read_raw(rank)?;
        NodeRecord::decode(&raw, rank)
    }

    /// Overwrites `bytes` at `offset` inside record `rank`.
    pub fn overwrite(&mut self, rank: u32, offset: usize, bytes: &[u8]) -> StorageResult<()> {
        if !self.writable {
            return Err(StorageError::write_failed(
                Stream::Table,
                "overwrite",
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "table opened read-only"),
            ));
        }
        self.seek_to(rank, offset, bytes.len())?;
        self.file
            .write_all(bytes)
            .map_err(|e| StorageError::write_failed(Stream::Table, "overwrite", e))
    }

    /// Overwrites a four-byte integer.
    pub fn write_u32(&mut self, rank: u32, offset: usize, value: u32) -> StorageResult<()> {
        self.overwrite(rank, offset, &value.to_be_bytes())
    }

    /// Overwrites a five-byte field.
    pub fn write_u40(&mut self, rank: u32, offset: usize, value: u64) -> StorageResult<()> {
        self.overwrite(rank, offset, &value.to_be_bytes()[3..])
    }

    /// Syncs and closes the file.
    pub fn close(self, sync: bool) -> StorageResult<()> {
        if sync && self.writable {
            self.file
                .sync_all()
                .map_err(|e| StorageError::write_failed(Stream::Table, "fsync", e))?;
        }
        Ok(())
    }
}
