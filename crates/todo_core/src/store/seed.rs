//! Default tasks created on first run.

use crate::id::generate_task_id;
use crate::model::task::{now_millis, Task};
use chrono::{DateTime, NaiveDate, Utc};

/// Returns the fixed seed set: four tasks, two of them completed.
///
/// IDs are freshly generated on every call; titles and timestamps are fixed.
pub fn default_tasks() -> Vec<Task> {
    vec![
        seed(
            "Plan the week",
            "List the three outcomes that matter most",
            false,
            seed_time(29, 9, 0),
            seed_time(29, 9, 0),
        ),
        seed(
            "Tidy the inbox",
            "Archive or answer everything older than a week",
            true,
            seed_time(29, 8, 0),
            seed_time(29, 10, 0),
        ),
        seed(
            "Sketch the data model",
            "Decide which fields each task needs",
            true,
            seed_time(28, 15, 0),
            seed_time(29, 8, 30),
        ),
        seed(
            "Set up local persistence",
            "Make sure tasks survive a restart",
            false,
            seed_time(29, 11, 0),
            seed_time(29, 11, 0),
        ),
    ]
}

fn seed(
    title: &str,
    description: &str,
    completed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
) -> Task {
    Task::with_timestamps(
        generate_task_id(),
        title,
        Some(description.to_string()),
        completed,
        created_at,
        updated_at,
    )
}

fn seed_time(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(2025, 9, day)
        .and_then(|date| date.and_hms_opt(hour, minute, 0))
        .map_or_else(now_millis, |naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::default_tasks;
    use std::collections::HashSet;

    #[test]
    fn seed_set_has_two_active_and_two_completed_tasks() {
        let tasks = default_tasks();
        assert_eq!(tasks.len(), 4);
        assert_eq!(tasks.iter().filter(|task| task.completed).count(), 2);
        assert!(tasks.iter().all(|task| task.updated_at >= task.created_at));
        assert!(tasks.iter().all(|task| !task.title.is_empty()));
    }

    #[test]
    fn seed_ids_are_unique() {
        let ids: HashSet<String> = default_tasks().into_iter().map(|task| task.id).collect();
        assert_eq!(ids.len(), 4);
    }
}
