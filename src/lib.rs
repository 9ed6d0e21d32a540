//! xmlstore - on-disk node tables for a native XML database
//!
//! A document is stored as a table of fixed 16-byte records in pre-order,
//! one per node, plus two overflow stores for text and attribute values.
//!
//! - `build`: streaming table construction with deferred patches
//! - `storage`: record layout, streams, metadata and read access
//! - `idmap`: maps stable node identifiers to current table positions
//! - `config`, `observability`, `cli`: ambient plumbing

pub mod build;
pub mod cli;
pub mod config;
pub mod idmap;
pub mod observability;
pub mod storage;
