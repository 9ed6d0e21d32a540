//! Database directory layout
//!
//! ```text
//! <db_root>/<name>/
//!     tbl.xdb   fixed-record node table
//!     txt.xdb   text overflow store
//!     atv.xdb   attribute value overflow store
//!     tmp.xdb   deferred patch log (only during a build)
//!     inf.xdb   metadata (JSON)
//! ```

use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

use super::errors::{StorageError, StorageResult};

/// The files that make up one database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    /// Node table
    Table,
    /// Document and text-like content
    Texts,
    /// Attribute values
    Values,
    /// Deferred patch log
    Patches,
    /// Metadata
    Info,
}

impl Stream {
    /// Short file stem
    pub fn as_str(&self) -> &'static str {
        match self {
            Stream::Table => "tbl",
            Stream::Texts => "txt",
            Stream::Values => "atv",
            Stream::Patches => "tmp",
            Stream::Info => "inf",
        }
    }

    fn file_name(&self) -> String {
        format!("{}.xdb", self.as_str())
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn validate_name(name: &str) -> StorageResult<()> {
    if name.is_empty() {
        return Err(StorageError::invalid_name(name, "name is empty"));
    }
    if name == "." || name == ".." {
        return Err(StorageError::invalid_name(name, "parent directory reference"));
    }
    if name.contains(['/', '\\', '\0']) || Path::new(name).is_absolute() {
        return Err(StorageError::invalid_name(name, "name must not contain path separators"));
    }
    // anything else that is not exactly one normal component, e.g. `C:`
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(StorageError::invalid_name(name, "name is not a plain directory name")),
    }
}

/// Paths of a single database directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbLayout {
    name: String,
    dir: PathBuf,
}

impl DbLayout {
    /// Layout of database `name` under `db_root`.
    ///
    /// The name must be a single plain path component, so the directory
    /// always sits directly below the root.
    pub fn new(db_root: &Path, name: &str) -> StorageResult<Self> {
        validate_name(name)?;
        Ok(Self {
            name: name.to_string(),
            dir: db_root.join(name),
        })
    }

    /// Database name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Database directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of one stream inside the directory
    pub fn path(&self, stream: Stream) -> PathBuf {
        self.dir.join(stream.file_name())
    }

    pub fn exists(&self) -> bool {
        self.dir.exists()
    }

    /// Removes any existing directory and creates an empty one.
    pub fn recreate(&self) -> StorageResult<()> {
        self.drop_dir()?;
        fs::create_dir_all(&self.dir).map_err(|e| {
            StorageError::io_error(
                format!("Failed to create database directory: {}", self.dir.display()),
                e,
            )
        })
    }

    /// Removes the directory and everything in it. Missing is fine.
    pub fn drop_dir(&self) -> StorageResult<()> {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io_error(
                format!("Failed to drop database directory: {}", self.dir.display()),
                e,
            )),
        }
    }
}
