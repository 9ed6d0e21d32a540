//! CRC32 checksums over whole store files
//!
//! The finished node table is summed once at the end of a build and the
//! value is kept in the metadata file. `verify` recomputes it.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crc32fast::Hasher;

use super::errors::{StorageError, StorageResult};
use super::layout::Stream;

/// Computes a CRC32 checksum over the provided data.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Streams a file through CRC32.
pub fn checksum_file(path: &Path, stream: Stream) -> StorageResult<u32> {
    let file = File::open(path).map_err(|e| StorageError::read_failed(stream, "open for checksum", e))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Hasher::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = reader
            .read(&mut buf)
            .map_err(|e| StorageError::read_failed(stream, "checksum", e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}
