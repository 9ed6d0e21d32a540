//! Streaming table builder
//!
//! Consumes pre-order node events and appends one record per node. Fields
//! that are only known in post-order go to the patch log and are applied by
//! the [`Reconciler`](super::Reconciler) once the table is closed.
//!
//! ```ignore
//! let mut builder = Builder::create(&config, "books", input_len)?;
//! let doc = builder.begin_document(b"books.xml")?;
//! let root = builder.begin_element(0, 0, 1, 0, false)?;
//! builder.add_text_like(LeafKind::Text, b"42", 1)?;
//! builder.request_size_patch(root, 2)?;
//! builder.request_size_patch(doc, 3)?;
//! let finished = builder.finish()?;
//! ```

use std::time::Instant;

use crate::config::BuildConfig;
use crate::observability::{Event, Logger, Phase};
use crate::storage::{
    DbLayout, NodeKind, NodeRecord, OverflowWriter, PackedName, Stream, StorageError,
    StorageResult, TableOutput, ValueRef, MAX_ATTRIBUTE_NAMES, MAX_ELEMENT_NAMES,
    MAX_NAMESPACES, MAX_OVERFLOW_OFFSET,
};

use super::inline::inline_int;
use super::patch::{Patch, PatchLog};
use super::reconcile::{ClosedBuild, Finished};

/// Leaf kinds accepted by [`Builder::add_text_like`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafKind {
    Text,
    Comment,
    ProcessingInstruction,
}

impl From<LeafKind> for NodeKind {
    fn from(kind: LeafKind) -> Self {
        match kind {
            LeafKind::Text => NodeKind::Text,
            LeafKind::Comment => NodeKind::Comment,
            LeafKind::ProcessingInstruction => NodeKind::ProcessingInstruction,
        }
    }
}

/// Counters reported when a build completes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub nodes: u32,
    pub inlined: u32,
    pub text_bytes: u64,
    pub value_bytes: u64,
    pub size_patches: u32,
    pub value_patches: u32,
}

/// Highest name and namespace ids seen, checked against the packed name width
///
/// Ids are dictionary-assigned from zero, so `max(id) + 1` is the number of
/// entries the packed field must be able to address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct NameCounts {
    pub element_names: u32,
    pub attribute_names: u32,
    pub namespaces: u32,
}

impl NameCounts {
    fn see_element(&mut self, name_id: u16, ns_id: u8) {
        self.element_names = self.element_names.max(name_id as u32 + 1);
        self.see_namespace(ns_id);
    }

    fn see_attribute(&mut self, name_id: u16, ns_id: u8) {
        self.attribute_names = self.attribute_names.max(name_id as u32 + 1);
        self.see_namespace(ns_id);
    }

    fn see_namespace(&mut self, ns_id: u8) {
        if ns_id > 0 {
            self.namespaces = self.namespaces.max(ns_id as u32 + 1);
        }
    }

    fn check(&self) -> StorageResult<()> {
        let limits = [
            ("element names", self.element_names, MAX_ELEMENT_NAMES),
            ("attribute names", self.attribute_names, MAX_ATTRIBUTE_NAMES),
            ("namespace prefixes", self.namespaces, MAX_NAMESPACES),
        ];
        for (what, actual, limit) in limits {
            if actual as u64 > limit {
                Logger::error(
                    Event::CapacityExceeded.as_str(),
                    &[
                        ("what", what),
                        ("actual", actual.to_string().as_str()),
                        ("limit", limit.to_string().as_str()),
                    ],
                );
                return Err(StorageError::capacity_exceeded(what, actual as u64, limit));
            }
        }
        Ok(())
    }
}

/// Append-only phase of a build.
///
/// Owns every stream of the new database. Dropping a builder without
/// calling [`finish`](Self::finish) or [`abort`](Self::abort) leaves the
/// partial directory behind.
pub struct Builder {
    layout: DbLayout,
    config: BuildConfig,
    input_size: u64,
    table: TableOutput,
    texts: OverflowWriter,
    values: OverflowWriter,
    patches: PatchLog,
    /// Next rank to assign
    size: u32,
    names: NameCounts,
    stats: BuildStats,
    started: Instant,
}

impl Builder {
    /// Drops any database called `name` under the configured root, creates
    /// an empty directory and opens all streams.
    ///
    /// `input_size` is the length of the parsed input, used to size buffers.
    pub fn create(config: &BuildConfig, name: &str, input_size: u64) -> StorageResult<Self> {
        config
            .validate()
            .map_err(|e| StorageError::invalid_config(e.message()))?;
        let layout = DbLayout::new(&config.db_root(), name)?;
        layout.recreate()?;

        match Self::open_streams(config, &layout, input_size) {
            Ok(builder) => {
                Logger::info(
                    Phase::Build.begin().as_str(),
                    &[
                        ("db", name),
                        ("input_size", input_size.to_string().as_str()),
                    ],
                );
                Ok(builder)
            }
            Err(e) => {
                let _ = layout.drop_dir();
                Err(e)
            }
        }
    }

    fn open_streams(config: &BuildConfig, layout: &DbLayout, input_size: u64) -> StorageResult<Self> {
        let buffer = config.buffer_size(input_size);
        Ok(Self {
            layout: layout.clone(),
            config: config.clone(),
            input_size,
            table: TableOutput::create(&layout.path(Stream::Table), buffer)?,
            texts: OverflowWriter::create(&layout.path(Stream::Texts), Stream::Texts, buffer)?,
            values: OverflowWriter::create(&layout.path(Stream::Values), Stream::Values, buffer)?,
            patches: PatchLog::create(&layout.path(Stream::Patches), buffer)?,
            size: 0,
            names: NameCounts::default(),
            stats: BuildStats::default(),
            started: Instant::now(),
        })
    }

    pub fn layout(&self) -> &DbLayout {
        &self.layout
    }

    /// Number of records written so far; also the rank of the next node.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    fn next_rank(&mut self) -> StorageResult<u32> {
        let rank = self.size;
        self.size = self.size.checked_add(1).ok_or_else(|| {
            StorageError::capacity_exceeded("nodes", u32::MAX as u64 + 1, u32::MAX as u64)
        })?;
        self.stats.nodes = self.size;
        Ok(rank)
    }

    /// Applies the inlining rule, appending to the matching store if needed.
    fn store_value(&mut self, value: &[u8], store: Stream) -> StorageResult<ValueRef> {
        if let Some(v) = inline_int(value) {
            self.stats.inlined += 1;
            return Ok(ValueRef::Inline(v));
        }
        let writer = match store {
            Stream::Values => &mut self.values,
            _ => &mut self.texts,
        };
        let offset = writer.append(value)?;
        if offset > MAX_OVERFLOW_OFFSET {
            return Err(StorageError::capacity_exceeded(
                "overflow bytes",
                offset,
                MAX_OVERFLOW_OFFSET,
            ));
        }
        match store {
            Stream::Values => self.stats.value_bytes = self.values.len(),
            _ => self.stats.text_bytes = self.texts.len(),
        }
        Ok(ValueRef::Offset(offset))
    }

    fn append(&mut self, record: NodeRecord) -> StorageResult<u32> {
        self.table.append(&record)?;
        Ok(record.rank())
    }

    /// Writes the document node. `name` is the document's name or URI.
    pub fn begin_document(&mut self, name: &[u8]) -> StorageResult<u32> {
        let text = self.store_value(name, Stream::Texts)?;
        let rank = self.next_rank()?;
        self.append(NodeRecord::Document {
            text,
            size: 1,
            rank,
        })
    }

    /// Writes an element node.
    ///
    /// `attr_count` is the number of attributes that follow; the subtree
    /// size starts at `attr_count + 1` until a size patch replaces it.
    pub fn begin_element(
        &mut self,
        name_id: u16,
        ns_id: u8,
        dist: u32,
        attr_count: u32,
        has_namespaces: bool,
    ) -> StorageResult<u32> {
        if attr_count >= u8::MAX as u32 {
            return Err(StorageError::capacity_exceeded(
                "attributes on one element",
                attr_count as u64,
                u8::MAX as u64 - 1,
            ));
        }
        self.names.see_element(name_id, ns_id);
        let rank = self.next_rank()?;
        let attr_size = attr_count as u8 + 1;
        self.append(NodeRecord::Element {
            name: PackedName {
                name_id,
                ns_id,
                has_namespaces,
            },
            attr_size,
            dist,
            size: attr_size as u32,
            rank,
        })
    }

    /// Writes an attribute node.
    pub fn begin_attribute(
        &mut self,
        name_id: u16,
        ns_id: u8,
        value: &[u8],
        dist: u32,
    ) -> StorageResult<u32> {
        self.names.see_attribute(name_id, ns_id);
        let value = self.store_value(value, Stream::Values)?;
        let rank = self.next_rank()?;
        self.append(NodeRecord::Attribute {
            name: PackedName {
                name_id,
                ns_id,
                has_namespaces: false,
            },
            value,
            dist,
            rank,
        })
    }

    /// Writes a text, comment or processing instruction node.
    pub fn add_text_like(&mut self, kind: LeafKind, value: &[u8], dist: u32) -> StorageResult<u32> {
        let value = self.store_value(value, Stream::Texts)?;
        let rank = self.next_rank()?;
        self.append(NodeRecord::Leaf {
            kind: kind.into(),
            value,
            dist,
            rank,
        })
    }

    fn check_written(&self, rank: u32) -> StorageResult<()> {
        if rank >= self.size {
            return Err(StorageError::corruption_at_rank(
                Stream::Patches,
                rank,
                format!("patch targets unwritten record ({} written)", self.size),
            ));
        }
        Ok(())
    }

    /// Defers setting the subtree size of the element or document at `rank`.
    pub fn request_size_patch(&mut self, rank: u32, size: u32) -> StorageResult<()> {
        self.check_written(rank)?;
        self.patches.append(&Patch::Size { rank, size })?;
        self.stats.size_patches += 1;
        Ok(())
    }

    /// Defers replacing the value of the attribute at `rank`.
    ///
    /// The inlining rule is applied now, so overflow bytes land in the value
    /// store before it is closed.
    pub fn request_value_patch(&mut self, rank: u32, value: &[u8]) -> StorageResult<()> {
        self.check_written(rank)?;
        let field = self.store_value(value, Stream::Values)?.to_field();
        self.patches.append(&Patch::Value { rank, field })?;
        self.stats.value_patches += 1;
        Ok(())
    }

    /// Checks name capacity and closes every stream.
    pub fn close(self) -> StorageResult<ClosedBuild> {
        self.names.check()?;

        let text_len = self.texts.len();
        let value_len = self.values.len();
        self.table.close()?;
        self.texts.close(self.config.sync_on_finish)?;
        self.values.close(self.config.sync_on_finish)?;
        let patch_count = self.patches.close()?;

        Ok(ClosedBuild {
            layout: self.layout,
            sync: self.config.sync_on_finish,
            size: self.size,
            text_len,
            value_len,
            names: self.names,
            input_size: self.input_size,
            patch_count,
            stats: self.stats,
            started: self.started,
        })
    }

    /// Runs the whole completion protocol: close, replay patches, write
    /// metadata. On any failure the database directory is removed.
    pub fn finish(self) -> StorageResult<Finished> {
        let layout = self.layout.clone();
        let result = self
            .close()
            .and_then(ClosedBuild::reconcile)
            .and_then(|mut reconciler| {
                reconciler.replay()?;
                reconciler.finish()
            });

        result.map_err(|e| {
            Logger::error(
                Phase::Build.failed().as_str(),
                &[("db", layout.name()), ("reason", e.to_string().as_str())],
            );
            drop_quietly(&layout);
            e
        })
    }

    /// Closes all streams and removes the database directory.
    pub fn abort(self) -> StorageResult<()> {
        let layout = self.layout;
        drop(self.table);
        drop(self.texts);
        drop(self.values);
        drop(self.patches);
        layout.drop_dir()?;
        Logger::warn(Event::DatabaseDropped.as_str(), &[("db", layout.name())]);
        Ok(())
    }
}

pub(crate) fn drop_quietly(layout: &DbLayout) {
    match layout.drop_dir() {
        Ok(()) => Logger::warn(Event::DatabaseDropped.as_str(), &[("db", layout.name())]),
        Err(e) => Logger::error(
            Event::DatabaseDropped.as_str(),
            &[("db", layout.name()), ("reason", e.to_string().as_str())],
        ),
    }
}
