//! Deferred patch log
//!
//! Facts that only become known after a subtree has been written (its size,
//! a resolved attribute value) are appended here and replayed against the
//! table once it is closed. Entry layout in `tmp.xdb`:
//!
//! ```text
//! bool  is_size
//! num   target rank
//! num   size            (size patch)
//! u40   value ref field (value patch)
//! ```
//!
//! Every entry is a plain overwrite, so replaying the log again yields the
//! same table; entries for one rank must keep their order so the last wins.

use std::path::Path;

use crate::storage::{DataInput, DataOutput, Stream, StorageResult};

/// One deferred overwrite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Patch {
    /// Subtree size of an element or document
    Size { rank: u32, size: u32 },
    /// Resolved value ref field of an attribute
    Value { rank: u32, field: u64 },
}

impl Patch {
    pub fn rank(&self) -> u32 {
        match self {
            Patch::Size { rank, .. } | Patch::Value { rank, .. } => *rank,
        }
    }
}

/// Append side of the patch log
pub struct PatchLog {
    out: DataOutput,
    entries: u32,
}

impl PatchLog {
    pub fn create(path: &Path, buffer_size: usize) -> StorageResult<Self> {
        Ok(Self {
            out: DataOutput::create(path, Stream::Patches, buffer_size)?,
            entries: 0,
        })
    }

    pub fn append(&mut self, patch: &Patch) -> StorageResult<()> {
        match *patch {
            Patch::Size { rank, size } => {
                self.out.write_bool(true)?;
                self.out.write_num(rank)?;
                self.out.write_num(size)?;
            }
            Patch::Value { rank, field } => {
                self.out.write_bool(false)?;
                self.out.write_num(rank)?;
                self.out.write_u40(field)?;
            }
        }
        self.entries += 1;
        Ok(())
    }

    pub fn entries(&self) -> u32 {
        self.entries
    }

    pub fn close(self) -> StorageResult<u32> {
        let entries = self.entries;
        self.out.close(false)?;
        Ok(entries)
    }
}

/// Sequential reader over a closed patch log
pub struct PatchReader {
    input: DataInput,
}

impl PatchReader {
    pub fn open(path: &Path) -> StorageResult<Self> {
        Ok(Self {
            input: DataInput::open(path, Stream::Patches)?,
        })
    }

    pub fn next_patch(&mut self) -> StorageResult<Option<Patch>> {
        if self.input.at_end()? {
            return Ok(None);
        }
        let is_size = self.input.read_bool()?;
        let rank = self.input.read_num()?;
        let patch = if is_size {
            Patch::Size {
                rank,
                size: self.input.read_num()?,
            }
        } else {
            Patch::Value {
                rank,
                field: self.input.read_u40()?,
            }
        };
        Ok(Some(patch))
    }
}
