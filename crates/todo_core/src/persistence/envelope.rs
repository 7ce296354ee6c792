//! Storage envelope encoding and decoding.

use super::FORMAT_VERSION;
use crate::model::task::{iso8601, parse_timestamp, Task};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Decoded form of a current-version envelope.
///
/// Only `tasks` decides whether stored bytes are usable. The write
/// `timestamp` is informational: a missing or malformed value decodes to
/// `None`. Unknown fields such as `backupTimestamp` are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageEnvelope {
    pub version: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    pub tasks: Vec<Task>,
}

fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(Value::as_str).and_then(parse_timestamp))
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: &'a str,
    #[serde(with = "iso8601")]
    timestamp: DateTime<Utc>,
    tasks: &'a [Task],
}

/// Approximate usage of the primary key against the assumed capacity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageUsage {
    pub used: usize,
    pub total: usize,
    /// Rounded to the nearest whole percent.
    pub percentage: u32,
}

impl StorageUsage {
    pub fn new(used: usize, total: usize) -> Self {
        let percentage = if total == 0 {
            0
        } else {
            ((used as f64 / total as f64) * 100.0).round() as u32
        };
        Self {
            used,
            total,
            percentage,
        }
    }
}

/// File name for a backup taken on `date`: `todo-backup-YYYY-MM-DD.json`.
pub fn backup_file_name(date: NaiveDate) -> String {
    format!("todo-backup-{}.json", date.format("%Y-%m-%d"))
}

pub(crate) fn encode_envelope(
    tasks: &[Task],
    timestamp: DateTime<Utc>,
) -> serde_json::Result<String> {
    serde_json::to_string(&EnvelopeRef {
        version: FORMAT_VERSION,
        timestamp,
        tasks,
    })
}

/// Result of decoding the raw primary-key value.
pub(crate) enum DecodedEnvelope {
    Current(Vec<Task>),
    /// Parsed JSON whose version tag is missing or differs from the current one.
    Legacy {
        found_version: Option<String>,
        value: Value,
    },
}

/// Decodes raw stored bytes.
///
/// Returns `Err(reason)` when the bytes are corrupt: not JSON, JSON `null`,
/// or a current-version envelope that does not match the task shape.
pub(crate) fn decode_envelope(raw: &str) -> Result<DecodedEnvelope, String> {
    let value: Value =
        serde_json::from_str(raw).map_err(|err| format!("stored value is not JSON: {err}"))?;
    if value.is_null() {
        return Err("stored value is null".to_string());
    }

    let version = value.get("version").and_then(Value::as_str);
    if version != Some(FORMAT_VERSION) {
        return Ok(DecodedEnvelope::Legacy {
            found_version: version.map(str::to_string),
            value,
        });
    }

    let envelope: StorageEnvelope = serde_json::from_value(value)
        .map_err(|err| format!("envelope does not match format {FORMAT_VERSION}: {err}"))?;

    if let Some(duplicate) = find_duplicate_id(&envelope.tasks) {
        return Err(format!("duplicate task id `{duplicate}`"));
    }

    let mut tasks = envelope.tasks;
    for task in &mut tasks {
        // Restored payloads are not validated per task before they land here.
        task.updated_at = task.updated_at.max(task.created_at);
    }
    Ok(DecodedEnvelope::Current(tasks))
}

fn find_duplicate_id(tasks: &[Task]) -> Option<&str> {
    let mut seen = HashSet::with_capacity(tasks.len());
    tasks
        .iter()
        .map(|task| task.id.as_str())
        .find(|id| !seen.insert(*id))
}
