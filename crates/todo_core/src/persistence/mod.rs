//! Versioned task persistence over a key-value store.
//!
//! # Responsibility
//! - Own the storage envelope format and its version tag.
//! - Migrate older persisted shapes forward.
//! - Recover from corrupt bytes without surfacing them as faults.
//! - Serialize backups and validate restore payloads.
//!
//! # Invariants
//! - Loading is total: any stored bytes map to a valid, possibly empty,
//!   task collection.
//! - Envelopes are fully serialized in memory before the single write call.
//! - Restore never writes a payload that lacks a `tasks` array.

use crate::kv::KvError;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod envelope;
mod manager;
mod migrate;

pub use envelope::{backup_file_name, StorageEnvelope, StorageUsage};
pub use manager::{LoadReport, LoadSource, PersistenceManager};

/// Current envelope format version.
pub const FORMAT_VERSION: &str = "1.0";
pub const DEFAULT_PRIMARY_KEY: &str = "todo-app-tasks";
pub const DEFAULT_VERSION_KEY: &str = "todo-app-version";
/// Assumed store capacity used for usage reporting (5 MiB).
pub const DEFAULT_CAPACITY_BYTES: usize = 5 * 1024 * 1024;

pub type PersistResult<T> = Result<T, PersistError>;

/// Store keys and capacity used by `PersistenceManager`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceConfig {
    pub primary_key: String,
    pub version_key: String,
    pub capacity_bytes: usize,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            primary_key: DEFAULT_PRIMARY_KEY.to_string(),
            version_key: DEFAULT_VERSION_KEY.to_string(),
            capacity_bytes: DEFAULT_CAPACITY_BYTES,
        }
    }
}

/// Stable classification of persistence failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    StorageUnavailable,
    StorageWrite,
    CorruptData,
    VersionMismatch,
    InvalidBackupFormat,
    ExportFailed,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StorageUnavailable => "storage_unavailable",
            Self::StorageWrite => "storage_write",
            Self::CorruptData => "corrupt_data",
            Self::VersionMismatch => "version_mismatch",
            Self::InvalidBackupFormat => "invalid_backup_format",
            Self::ExportFailed => "export_failed",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persistence-layer failure.
#[derive(Debug)]
pub enum PersistError {
    /// The store failed its availability probe.
    StorageUnavailable,
    /// Reading the primary key failed.
    StorageRead(KvError),
    /// The store rejected a write or remove.
    StorageWrite(KvError),
    Serialization(serde_json::Error),
    InvalidBackupFormat(String),
}

impl PersistError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::StorageUnavailable | Self::StorageRead(_) => ErrorKind::StorageUnavailable,
            Self::StorageWrite(_) | Self::Serialization(_) => ErrorKind::StorageWrite,
            Self::InvalidBackupFormat(_) => ErrorKind::InvalidBackupFormat,
        }
    }
}

impl Display for PersistError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StorageUnavailable => write!(f, "task storage is not available"),
            Self::StorageRead(err) => write!(f, "failed to read tasks: {err}"),
            Self::StorageWrite(err) => write!(f, "failed to write tasks: {err}"),
            Self::Serialization(err) => write!(f, "failed to serialize tasks: {err}"),
            Self::InvalidBackupFormat(reason) => write!(f, "invalid backup format: {reason}"),
        }
    }
}

impl Error for PersistError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StorageRead(err) | Self::StorageWrite(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::StorageUnavailable | Self::InvalidBackupFormat(_) => None,
        }
    }
}

impl From<serde_json::Error> for PersistError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}
