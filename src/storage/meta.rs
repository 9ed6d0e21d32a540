//! Database metadata file (`inf.xdb`)

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::{StorageError, StorageResult};
use super::layout::Stream;

/// Facts about a finished database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaData {
    /// Database name
    pub name: String,
    /// Number of node records
    pub size: u32,
    /// Length of the text overflow store
    pub text_len: u64,
    /// Length of the attribute value overflow store
    pub value_len: u64,
    /// Distinct element names referenced
    pub element_names: u32,
    /// Distinct attribute names referenced
    pub attribute_names: u32,
    /// Distinct namespace prefixes referenced
    pub namespaces: u32,
    /// Size of the parsed input, if known
    #[serde(default)]
    pub input_size: u64,
    /// CRC32 of the finished node table
    pub table_checksum: u32,
    pub created_at: DateTime<Utc>,
}

impl MetaData {
    pub fn write(&self, path: &Path) -> StorageResult<()> {
        let json = serde_json::to_vec_pretty(self).map_err(|e| {
            StorageError::write_failed(
                Stream::Info,
                "serialize metadata",
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })?;
        fs::write(path, json).map_err(|e| StorageError::write_failed(Stream::Info, "write", e))
    }

    pub fn read(path: &Path) -> StorageResult<Self> {
        let bytes = fs::read(path).map_err(|e| StorageError::read_failed(Stream::Info, "read", e))?;
        serde_json::from_slice(&bytes).map_err(|e| {
            StorageError::data_corruption(Stream::Info, format!("invalid metadata: {}", e))
        })
    }
}
