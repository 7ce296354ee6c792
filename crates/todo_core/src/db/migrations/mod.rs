//! Ordered schema steps for the key-value database.
//!
//! Steps run in ascending `version` order inside a single transaction, and
//! each one stamps `PRAGMA user_version` as it lands. A failing step rolls
//! the whole upgrade back and is reported with its version and name.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::{Connection, Transaction};

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "kv_entries",
    sql: include_str!("0001_kv_entries.sql"),
}];

/// Schema version this binary upgrades databases to.
pub fn latest_version() -> u32 {
    latest_of(MIGRATIONS)
}

/// Brings `conn` up to `latest_version()` and returns how many steps ran.
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the file is already past the latest
///   known version.
/// - `Migration` when a step fails; nothing from the upgrade is kept.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<usize> {
    run_steps(conn, MIGRATIONS)
}

fn latest_of(steps: &[Migration]) -> u32 {
    steps.iter().map(|step| step.version).max().unwrap_or(0)
}

fn run_steps(conn: &mut Connection, steps: &[Migration]) -> DbResult<usize> {
    let from = schema_version(conn)?;
    let latest = latest_of(steps);
    if from > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: latest,
        });
    }

    let pending: Vec<&Migration> = steps.iter().filter(|step| step.version > from).collect();
    if pending.is_empty() {
        return Ok(0);
    }

    let tx = conn.transaction()?;
    for step in &pending {
        apply_step(&tx, step).map_err(|source| DbError::Migration {
            version: step.version,
            name: step.name,
            source,
        })?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={} applied={}",
        from,
        latest,
        pending.len()
    );
    Ok(pending.len())
}

fn apply_step(tx: &Transaction<'_>, step: &Migration) -> rusqlite::Result<()> {
    tx.execute_batch(step.sql)?;
    tx.pragma_update(None, "user_version", step.version)
}

fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

#[cfg(test)]
mod tests {
    use super::{run_steps, schema_version, Migration, MIGRATIONS};
    use crate::db::DbError;
    use rusqlite::Connection;

    #[test]
    fn run_steps_counts_applied_and_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();

        assert_eq!(run_steps(&mut conn, MIGRATIONS).unwrap(), MIGRATIONS.len());
        assert_eq!(run_steps(&mut conn, MIGRATIONS).unwrap(), 0);
        assert_eq!(schema_version(&conn).unwrap(), 1);
    }

    #[test]
    fn failing_step_reports_version_and_rolls_back() {
        let steps = [
            MIGRATIONS[0],
            Migration {
                version: 2,
                name: "broken",
                sql: "CREATE TABLE kv_entries (key TEXT);",
            },
        ];
        let mut conn = Connection::open_in_memory().unwrap();

        match run_steps(&mut conn, &steps).unwrap_err() {
            DbError::Migration { version, name, .. } => {
                assert_eq!(version, 2);
                assert_eq!(name, "broken");
            }
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(schema_version(&conn).unwrap(), 0);
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE name = 'kv_entries';",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 0);
    }
}
