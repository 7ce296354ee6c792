use serde_json::Value;
use std::io;
use todo_core::{
    default_tasks, BackupSink, DirectorySink, ErrorKind, KeyValueStore, MemoryKvStore,
    PersistenceManager, Task, TaskFilter, TaskPatch, TaskStore,
};

const PRIMARY_KEY: &str = "todo-app-tasks";

fn loaded_store() -> TaskStore<MemoryKvStore> {
    let mut store = TaskStore::new(PersistenceManager::new(MemoryKvStore::new()));
    store.load_tasks();
    store
}

fn persisted_titles<S: KeyValueStore>(store: &TaskStore<S>) -> Vec<String> {
    store
        .persistence()
        .load()
        .into_iter()
        .map(|task| task.title)
        .collect()
}

#[derive(Default)]
struct RecordingSink {
    delivered: Vec<(String, String)>,
}

impl BackupSink for RecordingSink {
    fn deliver(&mut self, file_name: &str, contents: &str) -> io::Result<()> {
        self.delivered
            .push((file_name.to_string(), contents.to_string()));
        Ok(())
    }
}

struct FailingSink;

impl BackupSink for FailingSink {
    fn deliver(&mut self, _file_name: &str, _contents: &str) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
    }
}

#[test]
fn first_load_seeds_defaults_and_persists_them() {
    let store = loaded_store();

    assert!(!store.is_loading());
    assert!(store.last_error().is_none());
    assert_eq!(store.total_count(), default_tasks().len());
    assert_eq!(persisted_titles(&store).len(), 4);
    assert_eq!(store.persistence().load(), store.tasks());
}

#[test]
fn empty_existing_envelope_is_not_reseeded() {
    let persistence = PersistenceManager::new(MemoryKvStore::new());
    persistence.save(&[]).unwrap();

    let mut store = TaskStore::new(persistence);
    store.load_tasks();

    assert_eq!(store.total_count(), 0);
    assert!(store.last_error().is_none());
}

#[test]
fn corrupt_storage_recovers_to_empty_without_seeding() {
    let kv = MemoryKvStore::new();
    kv.set_item(PRIMARY_KEY, "not json").unwrap();
    let mut store = TaskStore::new(PersistenceManager::new(kv));

    store.load_tasks();

    assert_eq!(store.total_count(), 0);
    assert!(store.last_error().is_none());
    assert_eq!(store.last_warning(), Some(ErrorKind::CorruptData));
    assert!(store.persistence().store().get_item(PRIMARY_KEY).unwrap().is_none());
}

#[test]
fn legacy_data_is_migrated_and_rewritten_in_current_format() {
    let kv = MemoryKvStore::new();
    kv.set_item(PRIMARY_KEY, r#"[{"title":"old","completed":true}]"#)
        .unwrap();
    let mut store = TaskStore::new(PersistenceManager::new(kv));

    store.load_tasks();

    assert_eq!(store.total_count(), 1);
    assert_eq!(store.completed_count(), 1);
    let raw = store.persistence().store().get_item(PRIMARY_KEY).unwrap().unwrap();
    let envelope: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(envelope["version"], "1.0");
    assert_eq!(envelope["tasks"][0]["title"], "old");
}

#[test]
fn unavailable_storage_falls_back_to_seed_set() {
    let kv = MemoryKvStore::new();
    kv.set_writable(false);
    let mut store = TaskStore::new(PersistenceManager::new(kv));

    store.load_tasks();

    assert!(!store.is_loading());
    assert_eq!(store.last_error(), Some(ErrorKind::StorageUnavailable));
    assert_eq!(store.total_count(), 4);
}

#[test]
fn seed_write_failure_is_recorded_and_defaults_kept_in_memory() {
    let mut store = TaskStore::new(PersistenceManager::new(MemoryKvStore::with_quota(400)));

    store.load_tasks();

    assert_eq!(store.last_error(), Some(ErrorKind::StorageWrite));
    assert_eq!(store.total_count(), 4);
    assert!(store.persistence().store().get_item(PRIMARY_KEY).unwrap().is_none());
}

#[test]
fn every_mutation_autosaves() {
    let mut store = loaded_store();

    let id = store.add_task("  hello  ", None).unwrap();
    assert_eq!(store.tasks()[0].title, "hello");
    assert_eq!(persisted_titles(&store)[0], "hello");

    store.update_task(&id, &TaskPatch::title("renamed"));
    assert_eq!(persisted_titles(&store)[0], "renamed");

    store.toggle_task(&id);
    assert!(store.persistence().load()[0].completed);

    store.clear_completed();
    assert_eq!(store.persistence().load().len(), store.total_count());
    assert!(store.persistence().load().iter().all(|task| !task.completed));

    let remaining = store.tasks()[0].id.clone();
    store.delete_task(&remaining);
    assert_eq!(store.persistence().load(), store.tasks());
}

#[test]
fn blank_title_is_a_no_op() {
    let mut store = loaded_store();
    let before: Vec<Task> = store.tasks().to_vec();

    assert!(store.add_task("   ", Some("ignored")).is_none());
    assert_eq!(store.tasks(), before.as_slice());
}

#[test]
fn toggle_flips_completed_and_advances_updated_at() {
    let mut store = loaded_store();
    let id = store.add_task("flip me", None).unwrap();
    let before = store.find_task(&id).unwrap().clone();

    assert!(store.toggle_task(&id));
    let after = store.find_task(&id).unwrap();
    assert!(after.completed);
    assert!(after.updated_at > before.updated_at);
    assert_eq!(after.created_at, before.created_at);

    assert!(store.toggle_task(&id));
    assert!(!store.find_task(&id).unwrap().completed);
    assert!(!store.toggle_task("missing"));
}

#[test]
fn filtered_views_and_counts_follow_state() {
    let mut store = TaskStore::new(PersistenceManager::new(MemoryKvStore::new()));
    store.add_task("a", None);
    store.add_task("b", None);
    let done = store.add_task("c", None).unwrap();
    store.toggle_task(&done);

    store.set_filter(TaskFilter::Active);
    assert_eq!(store.filtered_tasks().len(), 2);
    store.set_filter(TaskFilter::Completed);
    assert_eq!(store.filtered_tasks().len(), 1);
    store.set_filter(TaskFilter::All);
    assert_eq!(store.filtered_tasks().len(), 3);

    assert_eq!(store.active_count(), 2);
    assert_eq!(store.completed_count(), 1);
    assert_eq!(store.total_count(), 3);
}

#[test]
fn autosave_failure_is_captured_and_data_stays_in_memory() {
    let mut store = loaded_store();
    store.persistence().store().set_writable(false);

    let id = store.add_task("unsaved", None);

    assert!(id.is_some());
    assert_eq!(store.tasks()[0].title, "unsaved");
    assert_eq!(store.last_error(), Some(ErrorKind::StorageWrite));

    store.persistence().store().set_writable(true);
    store.save_tasks();
    assert!(store.last_error().is_none());
    assert_eq!(persisted_titles(&store)[0], "unsaved");
}

#[test]
fn clear_all_data_empties_storage_and_memory() {
    let mut store = loaded_store();

    store.clear_all_data();

    assert_eq!(store.total_count(), 0);
    assert!(store.last_error().is_none());
    let raw = store.persistence().store().get_item(PRIMARY_KEY).unwrap().unwrap();
    let envelope: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(envelope["tasks"].as_array().unwrap().len(), 0);

    store.load_tasks();
    assert_eq!(store.total_count(), 0);
    assert!(store.last_error().is_none());
}

#[test]
fn export_delivers_dated_backup() {
    let mut store = loaded_store();
    let mut sink = RecordingSink::default();

    assert!(store.export_data(&mut sink));

    let (file_name, contents) = &sink.delivered[0];
    assert!(file_name.starts_with("todo-backup-"));
    assert!(file_name.ends_with(".json"));
    assert_eq!(file_name.len(), "todo-backup-YYYY-MM-DD.json".len());
    let backup: Value = serde_json::from_str(contents).unwrap();
    assert!(backup["backupTimestamp"].is_string());
    assert_eq!(backup["tasks"].as_array().unwrap().len(), 4);
}

#[test]
fn export_without_data_or_with_failing_sink_reports_false() {
    let mut empty = TaskStore::new(PersistenceManager::new(MemoryKvStore::new()));
    assert!(!empty.export_data(&mut RecordingSink::default()));

    let mut store = loaded_store();
    assert!(!store.export_data(&mut FailingSink));
    assert_eq!(store.last_error(), Some(ErrorKind::ExportFailed));
}

#[test]
fn directory_sink_writes_backup_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = loaded_store();
    let mut sink = DirectorySink::new(dir.path().join("backups"));

    assert!(store.export_data(&mut sink));

    let entries: Vec<_> = std::fs::read_dir(sink.dir()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn import_replaces_state_from_backup() {
    let mut source = loaded_store();
    source.add_task("only in source", None);
    let mut sink = RecordingSink::default();
    source.export_data(&mut sink);
    let backup = sink.delivered.remove(0).1;

    let mut target = loaded_store();
    assert!(target.import_data(&backup));

    assert_eq!(target.tasks(), source.tasks());
    assert!(!target.is_loading());
}

#[test]
fn rejected_import_leaves_state_untouched() {
    let mut store = loaded_store();
    store.add_task("keep me", None);
    let before: Vec<Task> = store.tasks().to_vec();

    assert!(!store.import_data(r#"{"foo":1}"#));
    assert!(!store.import_data("not json"));

    assert_eq!(store.tasks(), before.as_slice());
    assert_eq!(store.persistence().load(), before);
}
