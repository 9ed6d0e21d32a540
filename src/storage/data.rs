//! Read access to a finished database
//!
//! `NodeTable` opens the directory written by a build: the metadata file,
//! the node table and both overflow stores. Values are returned as the
//! bytes that were handed to the builder, whether they were inlined or not.

use super::checksum::checksum_file;
use super::errors::{StorageError, StorageResult};
use super::layout::{DbLayout, Stream};
use super::meta::MetaData;
use super::overflow::OverflowReader;
use super::record::{NodeKind, NodeRecord, ValueRef};
use super::table::TableAccess;

/// Read-only handle on a finished database
pub struct NodeTable {
    layout: DbLayout,
    meta: MetaData,
    table: TableAccess,
    texts: OverflowReader,
    values: OverflowReader,
}

impl NodeTable {
    pub fn open(layout: &DbLayout) -> StorageResult<Self> {
        let meta = MetaData::read(&layout.path(Stream::Info))?;
        let table = TableAccess::open(&layout.path(Stream::Table))?;

        if table.records() != meta.size {
            return Err(StorageError::data_corruption(
                Stream::Table,
                format!(
                    "table holds {} records, metadata says {}",
                    table.records(),
                    meta.size
                ),
            ));
        }

        Ok(Self {
            layout: layout.clone(),
            meta,
            table,
            texts: OverflowReader::open(&layout.path(Stream::Texts), Stream::Texts)?,
            values: OverflowReader::open(&layout.path(Stream::Values), Stream::Values)?,
        })
    }

    pub fn meta(&self) -> &MetaData {
        &self.meta
    }

    /// Number of nodes
    pub fn len(&self) -> u32 {
        self.meta.size
    }

    pub fn is_empty(&self) -> bool {
        self.meta.size == 0
    }

    /// Kind of the node at `rank`, read from the tag byte alone.
    pub fn kind(&mut self, rank: u32) -> StorageResult<NodeKind> {
        self.table.kind(rank)
    }

    pub fn record(&mut self, rank: u32) -> StorageResult<NodeRecord> {
        self.table.read(rank)
    }

    /// Value bytes of the node at `rank`, `None` for elements.
    pub fn value(&mut self, rank: u32) -> StorageResult<Option<Vec<u8>>> {
        let record = self.table.read(rank)?;
        let value = match record.value() {
            Some(value) => value,
            None => return Ok(None),
        };
        let bytes = match value {
            ValueRef::Inline(v) => v.to_string().into_bytes(),
            ValueRef::Offset(offset) if record.kind() == NodeKind::Attribute => {
                self.values.read(offset)?
            }
            ValueRef::Offset(offset) => self.texts.read(offset)?,
        };
        Ok(Some(bytes))
    }

    /// Recomputes the table checksum and compares it with the metadata.
    pub fn verify(&self) -> StorageResult<()> {
        let actual = checksum_file(&self.layout.path(Stream::Table), Stream::Table)?;
        if actual != self.meta.table_checksum {
            return Err(StorageError::data_corruption(
                Stream::Table,
                format!(
                    "checksum mismatch: stored {:08x}, computed {:08x}",
                    self.meta.table_checksum, actual
                ),
            ));
        }
        if self.texts.len() != self.meta.text_len || self.values.len() != self.meta.value_len {
            return Err(StorageError::data_corruption(
                Stream::Info,
                "overflow store lengths differ from metadata",
            ));
        }
        Ok(())
    }
}
