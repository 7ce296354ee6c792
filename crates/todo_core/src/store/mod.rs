//! Reactive in-memory task store.
//!
//! # Responsibility
//! - Hold the authoritative task collection and view filter.
//! - Derive filtered views and counts from current state on demand.
//! - Coordinate load-on-start and autosave-on-change with persistence.
//!
//! # Invariants
//! - Public operations never panic or return errors; failures are recorded
//!   in `last_error` or reported as a boolean.
//! - Autosave never runs while a load is in progress.

mod export;
mod seed;
mod task_store;

pub use export::{BackupSink, DirectorySink};
pub use seed::default_tasks;
pub use task_store::TaskStore;
