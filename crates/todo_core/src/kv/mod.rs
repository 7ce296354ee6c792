//! Key-value storage contracts and implementations.
//!
//! # Responsibility
//! - Define the synchronous get/set/remove contract persistence relies on.
//! - Provide an in-memory store and a SQLite-backed durable store.
//!
//! # Invariants
//! - `set_item` either stores the whole value or nothing.
//! - `remove_item` on an absent key succeeds.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryKvStore;
pub use sqlite::SqliteKvStore;

pub type KvResult<T> = Result<T, KvError>;

/// Failure reported by a key-value backend.
#[derive(Debug)]
pub enum KvError {
    /// Backend refuses all access (disabled, private mode, closed handle).
    Unavailable(String),
    /// Write would exceed the backend capacity.
    QuotaExceeded { requested: usize, limit: usize },
    Db(DbError),
}

impl Display for KvError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(reason) => write!(f, "key-value store unavailable: {reason}"),
            Self::QuotaExceeded { requested, limit } => write!(
                f,
                "key-value quota exceeded: {requested} bytes requested, limit is {limit}"
            ),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for KvError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Unavailable(_) | Self::QuotaExceeded { .. } => None,
        }
    }
}

impl From<DbError> for KvError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for KvError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Synchronous string key-value store.
pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> KvResult<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> KvResult<()>;
    fn remove_item(&self, key: &str) -> KvResult<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn get_item(&self, key: &str) -> KvResult<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> KvResult<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> KvResult<()> {
        (**self).remove_item(key)
    }
}
