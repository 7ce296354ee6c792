//! Core task persistence and state for the to-do application.
//! This crate owns the storage envelope format and the task store invariants.

pub mod db;
pub mod id;
pub mod kv;
pub mod logging;
pub mod model;
pub mod persistence;
pub mod store;

pub use id::generate_task_id;
pub use kv::{KeyValueStore, KvError, KvResult, MemoryKvStore, SqliteKvStore};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::task::{Task, TaskFilter, TaskId, TaskPatch, TaskStats, TaskValidationError};
pub use persistence::{
    backup_file_name, ErrorKind, LoadReport, LoadSource, PersistError, PersistResult,
    PersistenceConfig, PersistenceManager, StorageEnvelope, StorageUsage, FORMAT_VERSION,
};
pub use store::{default_tasks, BackupSink, DirectorySink, TaskStore};

/// Minimal health-check API used by the CLI probe.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
