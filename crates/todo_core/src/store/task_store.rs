//! Task store state, mutations and persistence coordination.
//!
//! # Invariants
//! - New tasks are prepended; display order is insertion order.
//! - Every mutation that changes the collection schedules a save unless
//!   `is_loading` is set.
//! - Seed tasks are persisted only when no value existed in storage.

use super::export::BackupSink;
use super::seed::default_tasks;
use crate::kv::KeyValueStore;
use crate::model::task::{Task, TaskFilter, TaskId, TaskPatch, TaskStats};
use crate::persistence::{
    backup_file_name, ErrorKind, LoadSource, PersistError, PersistResult, PersistenceManager,
};
use chrono::Utc;
use log::{debug, error, info, warn};

/// In-memory source of truth for tasks and the view filter.
pub struct TaskStore<S: KeyValueStore> {
    persistence: PersistenceManager<S>,
    tasks: Vec<Task>,
    filter: TaskFilter,
    is_loading: bool,
    last_error: Option<ErrorKind>,
    last_warning: Option<ErrorKind>,
}

impl<S: KeyValueStore> TaskStore<S> {
    /// Creates an empty store. Call `load_tasks` to populate it.
    pub fn new(persistence: PersistenceManager<S>) -> Self {
        Self {
            persistence,
            tasks: Vec::new(),
            filter: TaskFilter::All,
            is_loading: false,
            last_error: None,
            last_warning: None,
        }
    }

    pub fn persistence(&self) -> &PersistenceManager<S> {
        &self.persistence
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn filter(&self) -> TaskFilter {
        self.filter
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Last surfaced failure, cleared at the start of each load or save.
    pub fn last_error(&self) -> Option<ErrorKind> {
        self.last_error
    }

    /// Condition recovered locally during the last load (corrupt data or an
    /// unrecognized legacy shape).
    pub fn last_warning(&self) -> Option<ErrorKind> {
        self.last_warning
    }

    pub fn find_task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Tasks matching the current filter, in display order.
    pub fn filtered_tasks(&self) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|task| self.filter.matches(task))
            .collect()
    }

    pub fn stats(&self) -> TaskStats {
        TaskStats::from_tasks(&self.tasks)
    }

    pub fn active_count(&self) -> usize {
        self.stats().active
    }

    pub fn completed_count(&self) -> usize {
        self.stats().completed
    }

    pub fn total_count(&self) -> usize {
        self.tasks.len()
    }

    /// Prepends a new task. Returns its ID, or `None` when the title is blank.
    pub fn add_task(&mut self, title: &str, description: Option<&str>) -> Option<TaskId> {
        let task = match Task::new(title, description) {
            Ok(task) => task,
            Err(err) => {
                debug!("event=task_add module=store status=rejected reason={}", err);
                return None;
            }
        };

        let id = task.id.clone();
        self.tasks.insert(0, task);
        info!("event=task_add module=store status=ok id={}", id);
        self.autosave();
        Some(id)
    }

    /// Merges `patch` into the task with `id`.
    ///
    /// Returns `false` when no such task exists or the patch carries a blank
    /// title.
    pub fn update_task(&mut self, id: &str, patch: &TaskPatch) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            debug!("event=task_update module=store status=not_found id={}", id);
            return false;
        };

        if let Err(err) = task.apply_patch(patch) {
            debug!(
                "event=task_update module=store status=rejected id={} reason={}",
                id, err
            );
            return false;
        }

        info!("event=task_update module=store status=ok id={}", id);
        self.autosave();
        true
    }

    pub fn delete_task(&mut self, id: &str) -> bool {
        let Some(index) = self.tasks.iter().position(|task| task.id == id) else {
            debug!("event=task_delete module=store status=not_found id={}", id);
            return false;
        };

        self.tasks.remove(index);
        info!("event=task_delete module=store status=ok id={}", id);
        self.autosave();
        true
    }

    /// Flips `completed` on the task with `id`.
    pub fn toggle_task(&mut self, id: &str) -> bool {
        let Some(completed) = self.find_task(id).map(|task| task.completed) else {
            return false;
        };
        self.update_task(id, &TaskPatch::completed(!completed))
    }

    /// Removes every completed task and returns how many were removed.
    pub fn clear_completed(&mut self) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|task| !task.completed);
        let removed = before - self.tasks.len();

        if removed > 0 {
            info!(
                "event=tasks_clear_completed module=store status=ok removed={}",
                removed
            );
            self.autosave();
        }
        removed
    }

    /// Changes view state only; never persists.
    pub fn set_filter(&mut self, filter: TaskFilter) {
        self.filter = filter;
    }

    /// Loads tasks from persistence, seeding defaults on first run.
    ///
    /// On any failure the store falls back to the seed set in memory and
    /// records the failure in `last_error`.
    pub fn load_tasks(&mut self) {
        self.is_loading = true;
        self.last_error = None;
        self.last_warning = None;

        if let Err(err) = self.load_from_persistence() {
            error!(
                "event=tasks_load module=store status=fallback error_code={} error={}",
                err.kind(),
                err
            );
            self.last_error = Some(err.kind());
            self.tasks = default_tasks();
        }

        self.is_loading = false;
    }

    fn load_from_persistence(&mut self) -> PersistResult<()> {
        if !self.persistence.is_available() {
            return Err(PersistError::StorageUnavailable);
        }

        let report = self.persistence.load_report()?;
        self.last_warning = report.warning();

        match report.source {
            LoadSource::Empty => {
                self.tasks = default_tasks();
                self.persistence.save(&self.tasks)?;
                info!(
                    "event=tasks_seed module=store status=ok count={}",
                    self.tasks.len()
                );
            }
            LoadSource::Migrated {
                recognized: true, ..
            } => {
                self.tasks = report.tasks;
                // Rewrite in the current format so migration runs once.
                if let Err(err) = self.persistence.save(&self.tasks) {
                    warn!(
                        "event=tasks_migrate module=store status=unsaved error={}",
                        err
                    );
                    self.last_error = Some(err.kind());
                }
            }
            _ => self.tasks = report.tasks,
        }

        Ok(())
    }

    /// Persists the current collection, recording any failure in `last_error`.
    pub fn save_tasks(&mut self) {
        self.last_error = None;
        if let Err(err) = self.persistence.save(&self.tasks) {
            error!(
                "event=tasks_save module=store status=error error_code={} error={}",
                err.kind(),
                err
            );
            self.last_error = Some(err.kind());
        }
    }

    fn autosave(&mut self) {
        if self.is_loading {
            debug!("event=tasks_autosave module=store status=skipped reason=loading");
            return;
        }
        self.save_tasks();
    }

    /// Removes persisted data, then empties the in-memory collection.
    ///
    /// Emptying the collection autosaves like any other mutation, so the
    /// next load finds an empty envelope instead of re-seeding defaults.
    pub fn clear_all_data(&mut self) {
        match self.persistence.clear() {
            Ok(()) => {
                self.tasks.clear();
                self.last_error = None;
                info!("event=tasks_clear module=store status=ok");
                self.autosave();
            }
            Err(err) => {
                error!(
                    "event=tasks_clear module=store status=error error={}",
                    err
                );
                self.last_error = Some(err.kind());
            }
        }
    }

    /// Hands a backup of the stored envelope to `sink`.
    ///
    /// Returns `false` when nothing is stored or delivery fails.
    pub fn export_data(&mut self, sink: &mut dyn BackupSink) -> bool {
        let Some(backup) = self.persistence.backup() else {
            info!("event=tasks_export module=store status=skipped reason=no_data");
            return false;
        };

        let file_name = backup_file_name(Utc::now().date_naive());
        match sink.deliver(&file_name, &backup) {
            Ok(()) => {
                info!(
                    "event=tasks_export module=store status=ok file={}",
                    file_name
                );
                true
            }
            Err(err) => {
                error!(
                    "event=tasks_export module=store status=error file={} error={}",
                    file_name, err
                );
                self.last_error = Some(ErrorKind::ExportFailed);
                false
            }
        }
    }

    /// Restores `content` and reloads from it. Leaves state untouched when
    /// the payload is rejected.
    pub fn import_data(&mut self, content: &str) -> bool {
        if !self.persistence.restore(content) {
            return false;
        }
        self.load_tasks();
        true
    }
}
