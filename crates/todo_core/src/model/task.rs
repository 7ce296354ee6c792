//! Task record, patch and filter types.
//!
//! # Responsibility
//! - Define the canonical to-do item held by the task store.
//! - Define the serialized task shape embedded in the storage envelope.
//!
//! # Invariants
//! - `id` and `created_at` never change after construction.
//! - Every field mutation refreshes `updated_at` to a strictly later instant.
//! - Timestamps carry millisecond precision so envelope round-trips are exact.

use crate::id::generate_task_id;
use chrono::{DateTime, Duration, NaiveDateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Task identifier. Legacy data may carry arbitrary strings, so this is not
/// restricted to UUIDs.
pub type TaskId = String;

/// Returns the current UTC instant truncated to millisecond precision.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Formats a timestamp as ISO-8601 UTC with milliseconds (`...T09:00:00.000Z`).
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses an ISO-8601 timestamp, truncated to millisecond precision.
///
/// Accepts RFC 3339 strings with any offset, and offset-less date-times which
/// are read as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    let parsed = match DateTime::parse_from_rfc3339(trimmed) {
        Ok(parsed) => parsed.with_timezone(&Utc),
        Err(_) => NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()?
            .and_utc(),
    };
    Some(parsed.trunc_subsecs(3))
}

pub(crate) mod iso8601 {
    use super::{format_timestamp, parse_timestamp};
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_timestamp(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid ISO-8601 timestamp `{raw}`")))
    }
}

/// Validation errors for task input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskValidationError {
    /// Title is empty after trimming.
    EmptyTitle,
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "task title cannot be empty"),
        }
    }
}

impl Error for TaskValidationError {}

/// A single to-do item.
///
/// Serialized in camelCase with ISO-8601 timestamps, which is the
/// `SerializedTask` shape stored inside the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub completed: bool,
    #[serde(with = "iso8601")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "iso8601")]
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates an active task with a fresh ID and `created_at == updated_at == now`.
    ///
    /// # Errors
    /// - Returns `EmptyTitle` when `title` trims to an empty string.
    pub fn new(title: &str, description: Option<&str>) -> Result<Self, TaskValidationError> {
        let title = normalize_title(title)?;
        let now = now_millis();
        Ok(Self {
            id: generate_task_id(),
            title,
            description: normalize_description(description),
            completed: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// Builds a task with caller-provided timestamps.
    ///
    /// Used for seed data and migration where timestamps already exist.
    /// `updated_at` is clamped to be no earlier than `created_at`.
    pub fn with_timestamps(
        id: impl Into<TaskId>,
        title: impl Into<String>,
        description: Option<String>,
        completed: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description,
            completed,
            created_at,
            updated_at: updated_at.max(created_at),
        }
    }

    /// Refreshes `updated_at` to now.
    pub fn touch(&mut self) {
        self.touch_at(now_millis());
    }

    /// Refreshes `updated_at` to `now`, keeping it strictly increasing even
    /// when two mutations land in the same millisecond.
    pub fn touch_at(&mut self, now: DateTime<Utc>) {
        let floor = self.updated_at + Duration::milliseconds(1);
        self.updated_at = now.max(floor).max(self.created_at);
    }

    /// Merges `patch` into this task and refreshes `updated_at`.
    ///
    /// # Errors
    /// - Returns `EmptyTitle` when the patch carries a blank title; the task
    ///   is left unchanged in that case.
    pub fn apply_patch(&mut self, patch: &TaskPatch) -> Result<(), TaskValidationError> {
        let title = match patch.title.as_deref() {
            Some(value) => Some(normalize_title(value)?),
            None => None,
        };

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(description) = &patch.description {
            self.description = normalize_description(description.as_deref());
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        self.touch();
        Ok(())
    }
}

fn normalize_title(value: &str) -> Result<String, TaskValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TaskValidationError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

fn normalize_description(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

/// Partial update for `TaskStore::update_task`.
///
/// `id` and `created_at` are immutable and therefore not representable here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn title(value: impl Into<String>) -> Self {
        Self {
            title: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn completed(value: bool) -> Self {
        Self {
            completed: Some(value),
            ..Self::default()
        }
    }
}

/// View filter for the task list. Not part of task identity or persistence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl TaskFilter {
    pub fn matches(self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Active => !task.completed,
            Self::Completed => task.completed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

impl FromStr for TaskFilter {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            other => Err(format!(
                "unsupported task filter `{other}`; expected all|active|completed"
            )),
        }
    }
}

/// Derived counts over a task collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStats {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
}

impl TaskStats {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let completed = tasks.iter().filter(|task| task.completed).count();
        Self {
            total: tasks.len(),
            active: tasks.len() - completed,
            completed,
        }
    }
}
