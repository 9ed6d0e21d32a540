//! Buffered sequential streams
//!
//! `DataOutput` is the append side used while a build is running: it keeps
//! its own byte count, so callers learn the offset of an entry without
//! asking the file. `DataInput` reads the same primitives back in order.
//! All integers are big-endian.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use super::errors::{StorageError, StorageResult};
use super::layout::Stream;
use super::num;

/// Append-only buffered output stream
pub struct DataOutput {
    stream: Stream,
    writer: BufWriter<File>,
    /// Bytes written so far
    written: u64,
}

impl DataOutput {
    /// Creates (truncating) the file at `path`.
    pub fn create(path: &Path, stream: Stream, buffer_size: usize) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(|e| StorageError::write_failed(stream, "create", e))?;

        Ok(Self {
            stream,
            writer: BufWriter::with_capacity(buffer_size, file),
            written: 0,
        })
    }

    pub fn stream(&self) -> Stream {
        self.stream
    }

    /// Number of bytes appended since creation.
    pub fn written(&self) -> u64 {
        self.written
    }

    fn write_all(&mut self, bytes: &[u8], operation: &str) -> StorageResult<()> {
        self.writer
            .write_all(bytes)
            .map_err(|e| StorageError::write_failed(self.stream, operation, e))?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> StorageResult<()> {
        self.write_all(&[value], "write byte")
    }

    pub fn write_bool(&mut self, value: bool) -> StorageResult<()> {
        self.write_u8(value as u8)
    }

    pub fn write_u32(&mut self, value: u32) -> StorageResult<()> {
        self.write_all(&value.to_be_bytes(), "write u32")
    }

    /// Writes the low five bytes of `value`.
    pub fn write_u40(&mut self, value: u64) -> StorageResult<()> {
        self.write_all(&value.to_be_bytes()[3..], "write u40")
    }

    pub fn write_num(&mut self, value: u32) -> StorageResult<()> {
        let mut buf = Vec::with_capacity(5);
        num::encode(value, &mut buf);
        self.write_all(&buf, "write number")
    }

    /// Writes a length-prefixed entry and returns the bytes consumed.
    pub fn write_entry(&mut self, bytes: &[u8]) -> StorageResult<u64> {
        let len = u32::try_from(bytes.len()).map_err(|_| {
            StorageError::capacity_exceeded("bytes in one entry", bytes.len() as u64, u32::MAX as u64)
        })?;
        let before = self.written;
        self.write_num(len)?;
        self.write_all(bytes, "append entry")?;
        Ok(self.written - before)
    }

    /// Writes raw bytes without a length prefix.
    pub fn write_raw(&mut self, bytes: &[u8]) -> StorageResult<()> {
        self.write_all(bytes, "write raw")
    }

    /// Flushes buffered bytes and closes the file, optionally syncing it.
    pub fn close(self, sync: bool) -> StorageResult<()> {
        let stream = self.stream;
        let file = self
            .writer
            .into_inner()
            .map_err(|e| StorageError::write_failed(stream, "flush", e.into_error()))?;
        if sync {
            file.sync_all()
                .map_err(|e| StorageError::write_failed(stream, "fsync", e))?;
        }
        Ok(())
    }
}

/// Sequential buffered input stream
pub struct DataInput {
    stream: Stream,
    reader: BufReader<File>,
}

impl DataInput {
    pub fn open(path: &Path, stream: Stream) -> StorageResult<Self> {
        let file = File::open(path).map_err(|e| StorageError::read_failed(stream, "open", e))?;
        Ok(Self {
            stream,
            reader: BufReader::new(file),
        })
    }

    /// Returns true once every byte has been consumed.
    pub fn at_end(&mut self) -> StorageResult<bool> {
        let buf = self
            .reader
            .fill_buf()
            .map_err(|e| StorageError::read_failed(self.stream, "peek", e))?;
        Ok(buf.is_empty())
    }

    fn read_exact(&mut self, buf: &mut [u8], operation: &str) -> StorageResult<()> {
        self.reader
            .read_exact(buf)
            .map_err(|e| StorageError::read_failed(self.stream, operation, e))
    }

    pub fn read_u8(&mut self) -> StorageResult<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf, "read byte")?;
        Ok(buf[0])
    }

    pub fn read_bool(&mut self) -> StorageResult<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(StorageError::data_corruption(
                self.stream,
                format!("invalid boolean byte 0x{:02x}", other),
            )),
        }
    }

    pub fn read_u40(&mut self) -> StorageResult<u64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf[3..], "read u40")?;
        Ok(u64::from_be_bytes(buf))
    }

    pub fn read_num(&mut self) -> StorageResult<u32> {
        let mut buf = [0u8; 5];
        buf[0] = self.read_u8()?;
        let len = num::width(buf[0]);
        self.read_exact(&mut buf[1..len], "read number")?;
        num::decode(&buf[..len])
            .map(|(value, _)| value)
            .ok_or_else(|| StorageError::data_corruption(self.stream, "truncated number"))
    }
}
