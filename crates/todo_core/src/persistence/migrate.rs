//! Forward migration of legacy persisted shapes.
//!
//! # Invariants
//! - Migration never fails; unknown shapes become an empty collection.
//! - Migrated IDs are unique within the result.
//! - Missing or unparseable timestamps default to the migration time.

use crate::id::generate_task_id;
use crate::model::task::{parse_timestamp, Task};
use chrono::{DateTime, SubsecRound, TimeZone, Utc};
use serde_json::Value;
use std::collections::HashSet;

pub(crate) struct MigrationOutcome {
    pub tasks: Vec<Task>,
    /// `false` when the shape had no known mapping and was dropped.
    pub recognized: bool,
}

/// Maps a legacy value to the current task model.
///
/// Only the pre-versioning bare array shape has a mapping.
pub(crate) fn migrate_legacy(value: &Value, now: DateTime<Utc>) -> MigrationOutcome {
    let Value::Array(entries) = value else {
        return MigrationOutcome {
            tasks: Vec::new(),
            recognized: false,
        };
    };

    let mut seen = HashSet::with_capacity(entries.len());
    let tasks = entries
        .iter()
        .map(|entry| migrate_entry(entry, now, &mut seen))
        .collect();

    MigrationOutcome {
        tasks,
        recognized: true,
    }
}

fn migrate_entry(entry: &Value, now: DateTime<Utc>, seen: &mut HashSet<String>) -> Task {
    let id = entry
        .get("id")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty() && !seen.contains(*id))
        .map(str::to_string)
        .unwrap_or_else(generate_task_id);
    seen.insert(id.clone());

    let title = entry
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let description = entry
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string);
    let completed = entry.get("completed").is_some_and(is_truthy);
    let created_at = entry
        .get("createdAt")
        .and_then(timestamp_from_value)
        .unwrap_or(now);
    let updated_at = entry
        .get("updatedAt")
        .and_then(timestamp_from_value)
        .unwrap_or(now);

    Task::with_timestamps(id, title, description, completed, created_at, updated_at)
}

/// Loose boolean coercion used by the pre-versioning format.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number
            .as_f64()
            .is_some_and(|number| number != 0.0 && !number.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Accepts ISO-8601 strings and epoch milliseconds.
fn timestamp_from_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => parse_timestamp(text),
        Value::Number(number) => number
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
            .map(|timestamp| timestamp.trunc_subsecs(3)),
        _ => None,
    }
}
