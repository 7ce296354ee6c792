//! Persistence manager over a key-value store.
//!
//! # Responsibility
//! - Save and load the task collection under one well-known key.
//! - Mirror the format version under a secondary key.
//! - Produce backups and validate restore payloads.
//!
//! # Invariants
//! - `load_report` either returns tasks or a read error; it never returns
//!   partially decoded data.
//! - Corrupt primary values are removed before an empty result is returned.

use super::envelope::{decode_envelope, encode_envelope, DecodedEnvelope, StorageUsage};
use super::migrate::migrate_legacy;
use super::{ErrorKind, PersistError, PersistResult, PersistenceConfig, FORMAT_VERSION};
use crate::kv::KeyValueStore;
use crate::model::task::{format_timestamp, now_millis, Task};
use log::{error, info, warn};
use serde_json::Value;

const AVAILABILITY_PROBE_KEY: &str = "__storage_test__";
const AVAILABILITY_PROBE_VALUE: &str = "test";
const BACKUP_TIMESTAMP_FIELD: &str = "backupTimestamp";

/// Where the tasks of a `LoadReport` came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSource {
    /// Nothing stored under the primary key.
    Empty,
    /// Current-version envelope decoded directly.
    Current,
    /// Legacy value passed through migration.
    Migrated {
        from_version: Option<String>,
        /// `false` when no mapping existed and the data was dropped.
        recognized: bool,
    },
    /// Stored bytes were corrupt and have been cleared.
    Recovered { reason: String },
}

/// Detailed load result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub tasks: Vec<Task>,
    pub source: LoadSource,
}

impl LoadReport {
    /// Returns `true` when some value existed under the primary key.
    pub fn had_stored_data(&self) -> bool {
        !matches!(self.source, LoadSource::Empty)
    }

    /// Non-fatal condition that was recovered locally, if any.
    pub fn warning(&self) -> Option<ErrorKind> {
        match self.source {
            LoadSource::Recovered { .. } => Some(ErrorKind::CorruptData),
            LoadSource::Migrated {
                recognized: false, ..
            } => Some(ErrorKind::VersionMismatch),
            _ => None,
        }
    }
}

/// Durable, versioned storage for a task collection.
pub struct PersistenceManager<S: KeyValueStore> {
    store: S,
    config: PersistenceConfig,
}

impl<S: KeyValueStore> PersistenceManager<S> {
    /// Creates a manager using the default keys and capacity.
    pub fn new(store: S) -> Self {
        Self::with_config(store, PersistenceConfig::default())
    }

    pub fn with_config(store: S, config: PersistenceConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &PersistenceConfig {
        &self.config
    }

    /// Writes `tasks` as a current-version envelope, then mirrors the version.
    ///
    /// # Errors
    /// - `Serialization` when the envelope cannot be encoded.
    /// - `StorageWrite` when the store rejects either write.
    pub fn save(&self, tasks: &[Task]) -> PersistResult<()> {
        let raw = encode_envelope(tasks, now_millis())?;

        if let Err(err) = self.store.set_item(&self.config.primary_key, &raw) {
            error!(
                "event=tasks_save module=persistence status=error count={} bytes={} error={}",
                tasks.len(),
                raw.len(),
                err
            );
            return Err(PersistError::StorageWrite(err));
        }
        self.store
            .set_item(&self.config.version_key, FORMAT_VERSION)
            .map_err(|err| {
                error!(
                    "event=tasks_save module=persistence status=error stage=version_key error={}",
                    err
                );
                PersistError::StorageWrite(err)
            })?;

        info!(
            "event=tasks_save module=persistence status=ok count={} bytes={}",
            tasks.len(),
            raw.len()
        );
        Ok(())
    }

    /// Loads the task collection, degrading every failure to an empty one.
    pub fn load(&self) -> Vec<Task> {
        match self.load_report() {
            Ok(report) => report.tasks,
            Err(err) => {
                warn!(
                    "event=tasks_load module=persistence status=degraded error={}",
                    err
                );
                Vec::new()
            }
        }
    }

    /// Loads the task collection and reports how it was obtained.
    ///
    /// # Errors
    /// - `StorageRead` when the primary key cannot be read at all.
    pub fn load_report(&self) -> PersistResult<LoadReport> {
        let raw = match self.store.get_item(&self.config.primary_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                info!("event=tasks_load module=persistence status=ok source=empty count=0");
                return Ok(LoadReport {
                    tasks: Vec::new(),
                    source: LoadSource::Empty,
                });
            }
            Err(err) => {
                error!(
                    "event=tasks_load module=persistence status=error error={}",
                    err
                );
                return Err(PersistError::StorageRead(err));
            }
        };

        let report = match decode_envelope(&raw) {
            Ok(DecodedEnvelope::Current(tasks)) => LoadReport {
                tasks,
                source: LoadSource::Current,
            },
            Ok(DecodedEnvelope::Legacy {
                found_version,
                value,
            }) => self.migrate(found_version, &value),
            Err(reason) => {
                warn!(
                    "event=tasks_load module=persistence status=recovered error_code=corrupt_data reason={}",
                    reason
                );
                self.clear_quietly();
                LoadReport {
                    tasks: Vec::new(),
                    source: LoadSource::Recovered { reason },
                }
            }
        };

        info!(
            "event=tasks_load module=persistence status=ok source={} count={}",
            source_label(&report.source),
            report.tasks.len()
        );
        Ok(report)
    }

    fn migrate(&self, found_version: Option<String>, value: &Value) -> LoadReport {
        warn!(
            "event=tasks_migrate module=persistence status=start from_version={} to_version={}",
            found_version.as_deref().unwrap_or("none"),
            FORMAT_VERSION
        );

        let outcome = migrate_legacy(value, now_millis());
        if outcome.recognized {
            info!(
                "event=tasks_migrate module=persistence status=ok count={}",
                outcome.tasks.len()
            );
        } else {
            warn!(
                "event=tasks_migrate module=persistence status=dropped error_code=version_mismatch reason=unrecognized_shape"
            );
        }

        LoadReport {
            tasks: outcome.tasks,
            source: LoadSource::Migrated {
                from_version: found_version,
                recognized: outcome.recognized,
            },
        }
    }

    /// Removes the primary and version keys. Absent keys are not an error.
    ///
    /// Both removals are attempted even if the first fails.
    pub fn clear(&self) -> PersistResult<()> {
        let primary = self.store.remove_item(&self.config.primary_key);
        let version = self.store.remove_item(&self.config.version_key);

        match primary.and(version) {
            Ok(()) => {
                info!("event=tasks_clear module=persistence status=ok");
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=tasks_clear module=persistence status=error error={}",
                    err
                );
                Err(PersistError::StorageWrite(err))
            }
        }
    }

    fn clear_quietly(&self) {
        if let Err(err) = self.clear() {
            warn!(
                "event=tasks_clear module=persistence status=ignored error={}",
                err
            );
        }
    }

    /// Probes the store with a throwaway write and remove.
    pub fn is_available(&self) -> bool {
        let probe = self
            .store
            .set_item(AVAILABILITY_PROBE_KEY, AVAILABILITY_PROBE_VALUE)
            .and_then(|()| self.store.remove_item(AVAILABILITY_PROBE_KEY));

        match probe {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    "event=storage_probe module=persistence status=unavailable error={}",
                    err
                );
                false
            }
        }
    }

    /// Approximate byte usage of the stored envelope. Advisory only.
    pub fn get_usage(&self) -> StorageUsage {
        match self.store.get_item(&self.config.primary_key) {
            Ok(raw) => StorageUsage::new(
                raw.map_or(0, |raw| raw.len()),
                self.config.capacity_bytes,
            ),
            Err(err) => {
                warn!(
                    "event=storage_usage module=persistence status=error error={}",
                    err
                );
                StorageUsage::default()
            }
        }
    }

    /// Returns the stored envelope with an added `backupTimestamp`.
    ///
    /// Returns `None` when nothing is stored or the stored value is not a
    /// JSON object. Never writes.
    pub fn backup(&self) -> Option<String> {
        let raw = match self.store.get_item(&self.config.primary_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                error!("event=tasks_backup module=persistence status=error error={}", err);
                return None;
            }
        };

        let mut envelope = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(envelope)) => envelope,
            Ok(_) => {
                warn!("event=tasks_backup module=persistence status=skipped reason=not_an_object");
                return None;
            }
            Err(err) => {
                warn!("event=tasks_backup module=persistence status=skipped reason=invalid_json error={}", err);
                return None;
            }
        };

        envelope.insert(
            BACKUP_TIMESTAMP_FIELD.to_string(),
            Value::String(format_timestamp(&now_millis())),
        );
        match serde_json::to_string(&envelope) {
            Ok(backup) => {
                info!(
                    "event=tasks_backup module=persistence status=ok bytes={}",
                    backup.len()
                );
                Some(backup)
            }
            Err(err) => {
                error!("event=tasks_backup module=persistence status=error error={}", err);
                None
            }
        }
    }

    /// Validates `payload` and writes it verbatim under the primary key.
    ///
    /// Only the presence of a `tasks` array is checked here; individual task
    /// shapes are validated by the next `load`.
    ///
    /// # Errors
    /// - `InvalidBackupFormat` when the payload is not JSON or lacks a
    ///   `tasks` array. Nothing is written in that case.
    /// - `StorageWrite` when the store rejects the write.
    pub fn try_restore(&self, payload: &str) -> PersistResult<()> {
        let value: Value = serde_json::from_str(payload)
            .map_err(|err| PersistError::InvalidBackupFormat(format!("not JSON: {err}")))?;
        if !value.get("tasks").is_some_and(Value::is_array) {
            return Err(PersistError::InvalidBackupFormat(
                "missing `tasks` array".to_string(),
            ));
        }

        self.store
            .set_item(&self.config.primary_key, payload)
            .map_err(PersistError::StorageWrite)?;
        info!(
            "event=tasks_restore module=persistence status=ok bytes={}",
            payload.len()
        );
        Ok(())
    }

    /// Boolean form of `try_restore`.
    pub fn restore(&self, payload: &str) -> bool {
        match self.try_restore(payload) {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    "event=tasks_restore module=persistence status=rejected error_code={} error={}",
                    err.kind(),
                    err
                );
                false
            }
        }
    }
}

fn source_label(source: &LoadSource) -> &'static str {
    match source {
        LoadSource::Empty => "empty",
        LoadSource::Current => "current",
        LoadSource::Migrated { .. } => "migrated",
        LoadSource::Recovered { .. } => "recovered",
    }
}
