//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `todo_core` linkage without any UI runtime.
//! - Optionally open a SQLite-backed task store and print a summary.
//!
//! Usage: `todo_cli [db_path [all|active|completed]]`. `TODO_LOG_DIR` (absolute) enables file logs
//! at `TODO_LOG_LEVEL`, defaulting to the build-mode level.

use log::info;
use std::env;
use std::process::ExitCode;
use todo_core::{
    default_log_level, init_logging, PersistenceManager, SqliteKvStore, TaskFilter, TaskStore,
};

fn main() -> ExitCode {
    println!("todo_core ping={}", todo_core::ping());
    println!("todo_core version={}", todo_core::core_version());

    if let Ok(log_dir) = env::var("TODO_LOG_DIR") {
        let level = env::var("TODO_LOG_LEVEL").unwrap_or_else(|_| default_log_level().to_string());
        if let Err(err) = init_logging(&level, &log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    let Some(db_path) = env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };

    let kv = match SqliteKvStore::open(&db_path) {
        Ok(kv) => kv,
        Err(err) => {
            eprintln!("failed to open `{db_path}`: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut store = TaskStore::new(PersistenceManager::new(kv));
    store.load_tasks();
    if let Some(kind) = store.last_error() {
        eprintln!("load error: {kind}");
    }
    if let Some(kind) = store.last_warning() {
        eprintln!("load warning: {kind}");
    }

    let stats = store.stats();
    info!(
        "event=cli_summary module=cli status=ok total={} active={} completed={}",
        stats.total, stats.active, stats.completed
    );
    let usage = store.persistence().get_usage();
    println!(
        "tasks total={} active={} completed={}",
        stats.total, stats.active, stats.completed
    );
    println!(
        "storage used={} total={} percentage={}",
        usage.used, usage.total, usage.percentage
    );

    if let Some(filter) = env::args().nth(2) {
        match filter.parse::<TaskFilter>() {
            Ok(filter) => store.set_filter(filter),
            Err(err) => {
                eprintln!("{err}");
                return ExitCode::FAILURE;
            }
        }
    }
    for task in store.filtered_tasks() {
        let mark = if task.completed { 'x' } else { ' ' };
        println!("[{mark}] {} {}", task.id, task.title);
    }

    ExitCode::SUCCESS
}
