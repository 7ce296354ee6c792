//! Task identifier generation.
//!
//! IDs only need to be unique within one collection; they carry no security
//! meaning.

use uuid::Uuid;

/// Returns a fresh random identifier in hyphenated UUID v4 form.
pub fn generate_task_id() -> String {
    Uuid::new_v4().to_string()
}
