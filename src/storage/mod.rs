//! On-disk storage for node tables
//!
//! A database is a directory of flat files: a table of fixed 16-byte node
//! records addressed by rank, two append-only overflow stores for values
//! that cannot be inlined, and a JSON metadata file.
//!
//! # Design Principles
//!
//! - Uniform record width, so any node is one seek away
//! - The kind tag is readable without decoding the record
//! - Overflow stores are append-only and addressed by byte offset
//! - Every I/O error names the stream it happened on

mod checksum;
mod data;
mod errors;
mod layout;
mod meta;
pub mod num;
mod overflow;
mod record;
mod stream;
mod table;

pub use checksum::{checksum_file, compute_checksum};
pub use data::NodeTable;
pub use errors::{Severity, StorageError, StorageErrorCode, StorageResult};
pub use layout::{DbLayout, Stream};
pub use meta::MetaData;
pub use overflow::{OverflowReader, OverflowWriter};
pub use record::{
    NodeKind, NodeRecord, PackedName, ValueRef, INLINE_FLAG, MAX_ATTRIBUTE_NAMES,
    MAX_ELEMENT_NAMES, MAX_NAMESPACES, MAX_OVERFLOW_OFFSET, RECORD_SIZE, SIZE_OFFSET,
    VALUE_OFFSET,
};
pub use stream::{DataInput, DataOutput};
pub use table::{TableAccess, TableOutput};
