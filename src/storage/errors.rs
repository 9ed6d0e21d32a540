//! Storage error types
//!
//! Error codes:
//! - XS_STORAGE_IO_ERROR (ERROR severity)
//! - XS_STORAGE_WRITE_FAILED (ERROR severity)
//! - XS_STORAGE_READ_FAILED (ERROR severity)
//! - XS_CAPACITY_EXCEEDED (ERROR severity)
//! - XS_DATA_CORRUPTION (FATAL severity)
//!
//! Every I/O error names the stream it happened on, so a caller can decide
//! what to clean up.

use std::fmt;
use std::io;

use super::layout::Stream;

/// Severity levels for storage errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, caller may continue
    Error,
    /// On-disk state cannot be trusted
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Storage-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorCode {
    /// Directory or file handling failure
    XsStorageIoError,
    /// Write to one of the streams failed
    XsStorageWriteFailed,
    /// Read from one of the streams failed
    XsStorageReadFailed,
    /// A value does not fit its fixed-width encoding
    XsCapacityExceeded,
    /// Stored bytes are inconsistent
    XsDataCorruption,
    /// Database name cannot be used as a directory under the root
    XsInvalidName,
    /// Build settings are unusable
    XsInvalidConfig,
}

impl StorageErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            StorageErrorCode::XsStorageIoError => "XS_STORAGE_IO_ERROR",
            StorageErrorCode::XsStorageWriteFailed => "XS_STORAGE_WRITE_FAILED",
            StorageErrorCode::XsStorageReadFailed => "XS_STORAGE_READ_FAILED",
            StorageErrorCode::XsCapacityExceeded => "XS_CAPACITY_EXCEEDED",
            StorageErrorCode::XsDataCorruption => "XS_DATA_CORRUPTION",
            StorageErrorCode::XsInvalidName => "XS_INVALID_NAME",
            StorageErrorCode::XsInvalidConfig => "XS_INVALID_CONFIG",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            StorageErrorCode::XsDataCorruption => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for StorageErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Storage error with stream and operation context
#[derive(Debug)]
pub struct StorageError {
    code: StorageErrorCode,
    message: String,
    /// Stream the failure happened on, if any
    stream: Option<Stream>,
    details: Option<String>,
    source: Option<io::Error>,
}

impl StorageError {
    fn new(code: StorageErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            stream: None,
            details: None,
            source: None,
        }
    }

    /// Directory-level I/O failure (create, drop, rename)
    pub fn io_error(message: impl Into<String>, source: io::Error) -> Self {
        let mut err = Self::new(StorageErrorCode::XsStorageIoError, message);
        err.source = Some(source);
        err
    }

    /// Write failure on a stream
    pub fn write_failed(stream: Stream, operation: &str, source: io::Error) -> Self {
        let mut err = Self::new(
            StorageErrorCode::XsStorageWriteFailed,
            format!("{} failed on {}", operation, stream),
        );
        err.stream = Some(stream);
        err.source = Some(source);
        err
    }

    /// Read failure on a stream
    pub fn read_failed(stream: Stream, operation: &str, source: io::Error) -> Self {
        let mut err = Self::new(
            StorageErrorCode::XsStorageReadFailed,
            format!("{} failed on {}", operation, stream),
        );
        err.stream = Some(stream);
        err.source = Some(source);
        err
    }

    /// A count or offset exceeds its fixed encoding width
    pub fn capacity_exceeded(what: &str, actual: u64, limit: u64) -> Self {
        let mut err = Self::new(
            StorageErrorCode::XsCapacityExceeded,
            format!("too many {}", what),
        );
        err.details = Some(format!("actual: {}, limit: {}", actual, limit));
        err
    }

    /// Stored data does not decode
    pub fn data_corruption(stream: Stream, reason: impl Into<String>) -> Self {
        let mut err = Self::new(StorageErrorCode::XsDataCorruption, reason);
        err.stream = Some(stream);
        err
    }

    /// Database name rejected before touching the filesystem
    pub fn invalid_name(name: &str, reason: &str) -> Self {
        let mut err = Self::new(
            StorageErrorCode::XsInvalidName,
            format!("invalid database name {:?}", name),
        );
        err.details = Some(reason.to_string());
        err
    }

    /// Build configuration failed validation
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(StorageErrorCode::XsInvalidConfig, message)
    }

    /// Data corruption pinned to a record rank
    pub fn corruption_at_rank(stream: Stream, rank: u32, reason: impl Into<String>) -> Self {
        let mut err = Self::data_corruption(stream, reason);
        err.details = Some(format!("rank: {}", rank));
        err
    }

    /// Returns the error code
    pub fn code(&self) -> StorageErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the stream the error happened on
    pub fn stream(&self) -> Option<Stream> {
        self.stream
    }

    /// Returns additional error details
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Returns whether the on-disk state must be discarded
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        if let Some(ref source) = self.source {
            write!(f, ": {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
