//! In-process key-value store.
//!
//! Mirrors the failure modes of a browser-style blob store (quota and
//! disabled storage) so persistence error paths can be exercised.

use super::{KeyValueStore, KvError, KvResult};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

/// Single-threaded in-memory store.
#[derive(Debug)]
pub struct MemoryKvStore {
    entries: RefCell<BTreeMap<String, String>>,
    quota_bytes: Option<usize>,
    writable: Cell<bool>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(BTreeMap::new()),
            quota_bytes: None,
            writable: Cell::new(true),
        }
    }

    /// Creates a store whose total key+value size cannot exceed `limit` bytes.
    pub fn with_quota(limit: usize) -> Self {
        Self {
            quota_bytes: Some(limit),
            ..Self::new()
        }
    }

    /// Enables or disables writes. Disabled stores still serve reads.
    pub fn set_writable(&self, writable: bool) {
        self.writable.set(writable);
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    fn used_bytes_without(&self, key: &str) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|(existing, _)| existing.as_str() != key)
            .map(|(existing, value)| existing.len() + value.len())
            .sum()
    }
}

impl Default for MemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryKvStore {
    fn get_item(&self, key: &str) -> KvResult<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> KvResult<()> {
        if !self.writable.get() {
            return Err(KvError::Unavailable("writes are disabled".to_string()));
        }
        if let Some(limit) = self.quota_bytes {
            let requested = self.used_bytes_without(key) + key.len() + value.len();
            if requested > limit {
                return Err(KvError::QuotaExceeded { requested, limit });
            }
        }
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> KvResult<()> {
        if !self.writable.get() {
            return Err(KvError::Unavailable("writes are disabled".to_string()));
        }
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}
