//! Task domain model.
//!
//! # Responsibility
//! - Define the in-memory task record and its view/filter types.
//! - Own the serialized shape used inside the storage envelope.
//!
//! # Invariants
//! - Every task is identified by an ID that is unique within its collection.
//! - `updated_at >= created_at` for every task.

pub mod task;
