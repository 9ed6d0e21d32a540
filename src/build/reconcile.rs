//! Second pass of a build
//!
//! `ClosedBuild` is a build whose streams are flushed and closed.
//! `Reconciler` owns the node table for random access and replays the patch
//! log against it. `Finished` is what is left once the log is deleted and
//! the metadata file is written.

use std::fs;
use std::time::Instant;

use chrono::Utc;

use crate::observability::{Logger, ObservationScope, Phase};
use crate::storage::{
    checksum_file, DbLayout, MetaData, NodeTable, Stream, StorageError, StorageResult,
    TableAccess, SIZE_OFFSET, VALUE_OFFSET,
};

use super::builder::{BuildStats, NameCounts};
use super::patch::{Patch, PatchReader};

/// All streams closed, patches not yet applied
pub struct ClosedBuild {
    pub(crate) layout: DbLayout,
    pub(crate) sync: bool,
    pub(crate) size: u32,
    pub(crate) text_len: u64,
    pub(crate) value_len: u64,
    pub(crate) names: NameCounts,
    pub(crate) input_size: u64,
    pub(crate) patch_count: u32,
    pub(crate) stats: BuildStats,
    pub(crate) started: Instant,
}

impl ClosedBuild {
    pub fn layout(&self) -> &DbLayout {
        &self.layout
    }

    /// Number of entries waiting in the patch log.
    pub fn patch_count(&self) -> u32 {
        self.patch_count
    }

    /// Reopens the node table for patching.
    pub fn reconcile(self) -> StorageResult<Reconciler> {
        let table = TableAccess::open_rw(&self.layout.path(Stream::Table))?;
        if table.records() != self.size {
            return Err(StorageError::data_corruption(
                Stream::Table,
                format!(
                    "closed table holds {} records, builder wrote {}",
                    table.records(),
                    self.size
                ),
            ));
        }
        Ok(Reconciler {
            build: self,
            table,
            replays: 0,
        })
    }

    /// Removes the partial database.
    pub fn discard(self) -> StorageResult<()> {
        self.layout.drop_dir()
    }
}

/// Owns the node table while the patch log is replayed
pub struct Reconciler {
    build: ClosedBuild,
    table: TableAccess,
    replays: u32,
}

impl Reconciler {
    /// How many times the full log has been replayed.
    pub fn replays(&self) -> u32 {
        self.replays
    }

    fn apply(&mut self, patch: Patch) -> StorageResult<()> {
        let rank = patch.rank();
        let kind = self.table.kind(rank)?;
        match patch {
            Patch::Size { size, .. } => {
                if !kind.has_size() {
                    return Err(StorageError::corruption_at_rank(
                        Stream::Patches,
                        rank,
                        format!("size patch on {} record", kind.as_str()),
                    ));
                }
                self.table.write_u32(rank, SIZE_OFFSET, size)
            }
            Patch::Value { field, .. } => {
                if kind != crate::storage::NodeKind::Attribute {
                    return Err(StorageError::corruption_at_rank(
                        Stream::Patches,
                        rank,
                        format!("value patch on {} record", kind.as_str()),
                    ));
                }
                self.table.write_u40(rank, VALUE_OFFSET, field)
            }
        }
    }

    /// Replays the whole patch log in append order.
    ///
    /// Each entry overwrites its field, so calling this again after a
    /// failed or complete replay leaves the table in the same state.
    pub fn replay(&mut self) -> StorageResult<u32> {
        let scope = ObservationScope::with_fields(
            Phase::PatchReplay,
            vec![
                ("db", self.build.layout.name().to_string()),
                ("entries", self.build.patch_count.to_string()),
            ],
        );

        let mut reader = match PatchReader::open(&self.build.layout.path(Stream::Patches)) {
            Ok(reader) => reader,
            Err(e) => {
                scope.fail(&e.to_string());
                return Err(e);
            }
        };

        let mut applied = 0u32;
        loop {
            let step = reader
                .next_patch()
                .and_then(|patch| match patch {
                    Some(patch) => self.apply(patch).map(|_| true),
                    None => Ok(false),
                });
            match step {
                Ok(true) => applied += 1,
                Ok(false) => break,
                Err(e) => {
                    scope.fail(&e.to_string());
                    return Err(e);
                }
            }
        }

        self.replays += 1;
        scope.complete_with_fields(&[("applied", applied.to_string().as_str())]);
        Ok(applied)
    }

    /// Closes the table, deletes the patch log and writes the metadata file.
    pub fn finish(self) -> StorageResult<Finished> {
        let Reconciler { build, table, .. } = self;
        table.close(build.sync)?;

        let patches = build.layout.path(Stream::Patches);
        fs::remove_file(&patches)
            .map_err(|e| StorageError::write_failed(Stream::Patches, "delete", e))?;

        let meta = MetaData {
            name: build.layout.name().to_string(),
            size: build.size,
            text_len: build.text_len,
            value_len: build.value_len,
            element_names: build.names.element_names,
            attribute_names: build.names.attribute_names,
            namespaces: build.names.namespaces,
            input_size: build.input_size,
            table_checksum: checksum_file(&build.layout.path(Stream::Table), Stream::Table)?,
            created_at: Utc::now(),
        };
        meta.write(&build.layout.path(Stream::Info))?;

        let stats = build.stats;
        Logger::info(
            Phase::Build.complete().as_str(),
            &[
                ("db", meta.name.as_str()),
                ("nodes", stats.nodes.to_string().as_str()),
                ("inlined", stats.inlined.to_string().as_str()),
                ("text_bytes", stats.text_bytes.to_string().as_str()),
                ("value_bytes", stats.value_bytes.to_string().as_str()),
                ("size_patches", stats.size_patches.to_string().as_str()),
                ("value_patches", stats.value_patches.to_string().as_str()),
                (
                    "elapsed_ms",
                    build.started.elapsed().as_millis().to_string().as_str(),
                ),
            ],
        );

        Ok(Finished {
            layout: build.layout,
            meta,
            stats,
        })
    }

    /// Closes the table and removes the partial database.
    pub fn discard(self) -> StorageResult<()> {
        drop(self.table);
        self.build.discard()
    }
}

/// A completed database directory
#[derive(Debug, Clone)]
pub struct Finished {
    layout: DbLayout,
    meta: MetaData,
    stats: BuildStats,
}

impl Finished {
    pub fn layout(&self) -> &DbLayout {
        &self.layout
    }

    pub fn meta(&self) -> &MetaData {
        &self.meta
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    /// Opens the database for reading.
    pub fn open(&self) -> StorageResult<NodeTable> {
        NodeTable::open(&self.layout)
    }
}
