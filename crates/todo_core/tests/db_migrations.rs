use rusqlite::Connection;
use todo_core::db::migrations::{apply_migrations, latest_version};
use todo_core::db::{open_db, open_db_in_memory, DbError};
use todo_core::{KeyValueStore, KvError, SqliteKvStore};

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "kv_entries");
}

#[test]
fn apply_migrations_reports_steps_and_skips_current_schema() {
    let mut fresh = Connection::open_in_memory().unwrap();
    assert_eq!(apply_migrations(&mut fresh).unwrap(), latest_version() as usize);
    assert_table_exists(&fresh, "kv_entries");

    let mut opened = open_db_in_memory().unwrap();
    assert_eq!(apply_migrations(&mut opened).unwrap(), 0);
}

#[test]
fn reopening_store_file_keeps_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todo.sqlite3");

    let first = SqliteKvStore::open(&path).unwrap();
    first.set_item("todo-app-version", "1.0").unwrap();
    drop(first);

    let second = SqliteKvStore::open(&path).unwrap();
    assert_eq!(schema_version(second.connection()), latest_version());
    assert_eq!(
        second.get_item("todo-app-version").unwrap().as_deref(),
        Some("1.0")
    );
}

#[test]
fn sqlite_store_overwrites_and_removes_idempotently() {
    let store = SqliteKvStore::open_in_memory().unwrap();

    store.set_item("k", "one").unwrap();
    store.set_item("k", "two").unwrap();
    assert_eq!(store.get_item("k").unwrap().as_deref(), Some("two"));

    store.remove_item("k").unwrap();
    store.remove_item("k").unwrap();
    assert!(store.get_item("k").unwrap().is_none());

    let rows: i64 = store
        .connection()
        .query_row("SELECT COUNT(*) FROM kv_entries;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 0);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        open_db(&path).unwrap_err().code(),
        "db_schema_too_new"
    );

    let err = SqliteKvStore::open(&path).err().unwrap();
    assert!(matches!(
        err,
        KvError::Db(DbError::UnsupportedSchemaVersion { .. })
    ));
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
