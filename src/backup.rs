//! Backup envelopes: export, import, restore and the automatic backup.
//!
//! An envelope bundles the three persisted documents with a format version
//! and creation time. Legacy files (`version`, ISO
//! `timestamp`, `todos`, `profile`, `settings`) import unchanged.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::lock;
use crate::progression::Profile;
use crate::settings::Settings;
use crate::storage::{
    self, KvStore, AUTO_BACKUP_KEY, LAST_AUTO_BACKUP_KEY, PROFILE_KEY, SETTINGS_KEY, TODOS_KEY,
};
use crate::task::{self, StoredTask, Task};

pub const BACKUP_VERSION: &str = "1.0.0";
pub const DEFAULT_AUTO_INTERVAL_DAYS: u32 = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backup {
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub todos: Vec<Task>,
    pub profile: Profile,
    pub settings: Settings,
}

impl Backup {
    /// Snapshot the current contents of `store`.
    pub fn capture<S: KvStore + ?Sized>(store: &S, now: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            version: BACKUP_VERSION.to_string(),
            timestamp: now,
            todos: storage::load_tasks(store, now)?,
            profile: storage::load_profile(store)?,
            settings: storage::load_settings(store)?,
        })
    }

    /// Structural check on an untyped envelope.
    ///
    /// `version` and `timestamp` are required; `todos` must be an array and
    /// `profile`/`settings` objects when present.
    pub fn validate(value: &Value) -> Result<()> {
        let Some(envelope) = value.as_object() else {
            return Err(invalid("backup must be a JSON object"));
        };
        for field in ["version", "timestamp"] {
            match envelope.get(field) {
                Some(Value::String(text)) if !text.trim().is_empty() => {}
                _ => return Err(invalid(&format!("missing '{field}'"))),
            }
        }
        match envelope.get("todos") {
            None | Some(Value::Null) | Some(Value::Array(_)) => {}
            Some(_) => return Err(invalid("'todos' must be an array")),
        }
        for field in ["profile", "settings"] {
            match envelope.get(field) {
                None | Some(Value::Null) | Some(Value::Object(_)) => {}
                Some(_) => return Err(invalid(&format!("'{field}' must be an object"))),
            }
        }
        Ok(())
    }

    /// Validate and decode an envelope. Task records are repaired the same
    /// way stored lists are.
    pub fn from_value(value: Value, now: DateTime<Utc>) -> Result<Self> {
        Self::validate(&value)?;
        let Value::Object(mut envelope) = value else {
            return Err(invalid("backup must be a JSON object"));
        };

        let version = envelope
            .get("version")
            .and_then(Value::as_str)
            .unwrap_or(BACKUP_VERSION)
            .to_string();
        let timestamp = envelope
            .get("timestamp")
            .and_then(Value::as_str)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|stamp| stamp.with_timezone(&Utc))
            .ok_or_else(|| invalid("'timestamp' is not an RFC 3339 date"))?;

        let stored: Vec<StoredTask> = match envelope.remove("todos") {
            Some(Value::Array(items)) => {
                let total = items.len();
                let records: Vec<StoredTask> =
                    items.into_iter().filter_map(StoredTask::from_entry).collect();
                if records.len() < total {
                    tracing::warn!(
                        dropped = total - records.len(),
                        "skipping backup task entries that are not objects"
                    );
                }
                records
            }
            _ => Vec::new(),
        };
        let (todos, issues) = task::repair(stored, now);
        for issue in &issues {
            tracing::warn!(issue = %issue, "repaired task record in backup");
        }

        let profile: Profile = decode_section(envelope.remove("profile"), "profile")?;
        let settings: Settings = decode_section(envelope.remove("settings"), "settings")?;

        Ok(Self {
            version,
            timestamp,
            todos,
            profile: profile.sanitized(),
            settings: settings.sanitized(),
        })
    }

    pub fn from_json(raw: &str, now: DateTime<Utc>) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|err| invalid(&format!("not valid JSON: {err}")))?;
        Self::from_value(value, now)
    }
}

fn invalid(message: &str) -> Error {
    Error::InvalidBackup(message.to_string())
}

fn decode_section<T: serde::de::DeserializeOwned + Default>(
    value: Option<Value>,
    name: &str,
) -> Result<T> {
    match value {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value)
            .map_err(|err| invalid(&format!("'{name}' is malformed: {err}"))),
    }
}

/// `sticker-backup-YYYY-MM-DD.json`
pub fn default_filename(now: DateTime<Utc>) -> String {
    format!("sticker-backup-{}.json", now.format("%Y-%m-%d"))
}

/// Raw documents kept so a failed restore can put them back untouched.
struct Snapshot {
    entries: Vec<(&'static str, Option<Value>)>,
}

impl Snapshot {
    fn take<S: KvStore + ?Sized>(store: &S) -> Result<Self> {
        let mut entries = Vec::new();
        for key in [TODOS_KEY, PROFILE_KEY, SETTINGS_KEY] {
            let value = match store.get(key) {
                Ok(value) => value,
                // Unparseable data is what the restore is replacing.
                Err(Error::Json(_)) => None,
                Err(err) => return Err(err),
            };
            entries.push((key, value));
        }
        Ok(Self { entries })
    }

    fn put_back<S: KvStore + ?Sized>(&self, store: &S) -> Result<()> {
        for (key, value) in &self.entries {
            match value {
                Some(value) => store.set(key, value)?,
                None => store.remove(key)?,
            }
        }
        Ok(())
    }
}

/// Write a backup over the current data. If any write fails the previous
/// documents are put back and the error is reported.
pub fn restore<S: KvStore + ?Sized>(store: &S, backup: &Backup) -> Result<()> {
    let previous = Snapshot::take(store)?;

    let written = storage::save_tasks(store, &backup.todos)
        .and_then(|()| storage::save_profile(store, &backup.profile))
        .and_then(|()| storage::save_settings(store, &backup.settings));

    if let Err(err) = written {
        tracing::error!(error = %err, "restore failed, rolling back");
        if let Err(rollback_err) = previous.put_back(store) {
            tracing::error!(error = %rollback_err, "rollback failed");
            return Err(Error::OperationFailed(format!(
                "restore failed ({err}) and rollback failed ({rollback_err})"
            )));
        }
        return Err(Error::OperationFailed(format!(
            "restore failed, previous data kept: {err}"
        )));
    }

    tracing::info!(
        todos = backup.todos.len(),
        version = %backup.version,
        "backup restored"
    );
    Ok(())
}

/// Write the current data to `target`. A directory target gets the
/// default file name.
pub fn export_to_file<S: KvStore + ?Sized>(
    store: &S,
    target: &Path,
    now: DateTime<Utc>,
) -> Result<(PathBuf, Backup)> {
    let backup = Backup::capture(store, now)?;
    let path = if target.is_dir() {
        target.join(default_filename(now))
    } else {
        target.to_path_buf()
    };
    let json = serde_json::to_string_pretty(&backup)?;
    lock::write_atomic(&path, json.as_bytes())?;
    tracing::info!(path = %path.display(), "backup exported");
    Ok((path, backup))
}

pub fn import_from_file(path: &Path, now: DateTime<Utc>) -> Result<Backup> {
    let raw = fs::read_to_string(path)?;
    Backup::from_json(&raw, now)
}

/// Store a backup under `auto-backup` unless the last one is younger than
/// `interval_days`. Returns the new backup when one was taken.
pub fn auto_backup<S: KvStore + ?Sized>(
    store: &S,
    now: DateTime<Utc>,
    interval_days: u32,
) -> Result<Option<Backup>> {
    if let Some(last) = last_auto_backup(store)? {
        if now - last < Duration::days(i64::from(interval_days)) {
            tracing::debug!(%last, interval_days, "auto backup not due");
            return Ok(None);
        }
    }

    let backup = Backup::capture(store, now)?;
    storage::save_json(store, AUTO_BACKUP_KEY, &backup)?;
    store.set(LAST_AUTO_BACKUP_KEY, &Value::String(now.to_rfc3339()))?;
    tracing::info!(todos = backup.todos.len(), "auto backup stored");
    Ok(Some(backup))
}

pub fn last_auto_backup<S: KvStore + ?Sized>(store: &S) -> Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = storage::load_optional(store, LAST_AUTO_BACKUP_KEY)?;
    Ok(raw
        .as_deref()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|stamp| stamp.with_timezone(&Utc)))
}

/// The stored automatic backup, if present and valid.
pub fn load_auto_backup<S: KvStore + ?Sized>(
    store: &S,
    now: DateTime<Utc>,
) -> Result<Option<Backup>> {
    let Some(value) = storage::load_optional::<S, Value>(store, AUTO_BACKUP_KEY)? else {
        return Ok(None);
    };
    match Backup::from_value(value, now) {
        Ok(backup) => Ok(Some(backup)),
        Err(err) => {
            tracing::warn!(error = %err, "ignoring invalid auto backup");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;
    use serde_json::json;
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 8, 30, 0).unwrap()
    }

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        let tasks = task::add(&[], "pack lunch", task::AddOptions { emoji: None, now: now() });
        storage::save_tasks(&store, &tasks).unwrap();
        let mut profile = Profile::default();
        profile.xp = 60;
        storage::save_profile(&store, &profile).unwrap();
        store
    }

    /// Fails every write to one key.
    struct FailingStore {
        inner: MemoryStore,
        fail_key: &'static str,
    }

    impl KvStore for FailingStore {
        fn get(&self, key: &str) -> Result<Option<Value>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &Value) -> Result<()> {
            if key == self.fail_key {
                return Err(Error::OperationFailed("disk full".to_string()));
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<()> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn validate_rejects_bad_shapes() {
        assert!(Backup::validate(&json!([])).is_err());
        assert!(Backup::validate(&json!({ "timestamp": "2026-10-16T00:00:00Z" })).is_err());
        assert!(Backup::validate(&json!({ "version": "1.0.0" })).is_err());
        assert!(Backup::validate(
            &json!({ "version": "1.0.0", "timestamp": "2026-10-16T00:00:00Z", "todos": {} })
        )
        .is_err());
        assert!(Backup::validate(
            &json!({ "version": "1.0.0", "timestamp": "2026-10-16T00:00:00Z", "profile": 3 })
        )
        .is_err());
        assert!(Backup::validate(
            &json!({ "version": "1.0.0", "timestamp": "2026-10-16T00:00:00Z" })
        )
        .is_ok());
    }

    #[test]
    fn legacy_backup_imports() {
        let raw = json!({
            "version": "1.0.0",
            "timestamp": "2026-10-10T09:00:00.000Z",
            "todos": [
                { "id": 1728550000000u64, "text": "old id", "completed": false,
                  "createdAt": "2026-10-09T09:00:00.000Z", "pinned": true }
            ],
            "profile": { "level": 3, "xp": 20, "totalXP": 370, "achievements": ["first_todo"] },
            "settings": { "theme": "mint", "opacity": 80 }
        })
        .to_string();

        let backup = Backup::from_json(&raw, now()).unwrap();
        assert_eq!(backup.todos[0].id, "1728550000000");
        assert!(backup.todos[0].pinned);
        assert_eq!(backup.profile.level, 3);
        assert_eq!(backup.profile.total_xp, 370);
        assert_eq!(backup.settings.theme, "mint");
        assert!(backup.settings.sound_enabled);
    }

    #[test]
    fn mistyped_task_fields_do_not_reject_backup() {
        let raw = json!({
            "version": "1.0.0",
            "timestamp": "2026-10-10T09:00:00.000Z",
            "todos": [
                { "id": "a", "text": "numeric flag", "completed": 1,
                  "createdAt": "2026-10-09T09:00:00.000Z" },
                { "id": "b", "text": "broken date", "createdAt": "Invalid Date" },
                "stray string",
                { "id": "c", "text": "fine", "completed": false,
                  "createdAt": "2026-10-09T09:00:00.000Z" }
            ]
        })
        .to_string();

        let backup = Backup::from_json(&raw, now()).unwrap();
        let ids: Vec<&str> = backup.todos.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert!(backup.todos[0].completed);
        assert_eq!(backup.todos[1].created_at, now());
    }

    #[test]
    fn from_json_reports_invalid_backup() {
        assert!(matches!(
            Backup::from_json("not json", now()),
            Err(Error::InvalidBackup(_))
        ));
        assert!(matches!(
            Backup::from_json(r#"{"version":"1.0.0","timestamp":"yesterday"}"#, now()),
            Err(Error::InvalidBackup(_))
        ));
    }

    #[test]
    fn export_then_restore_into_fresh_store() {
        let temp = TempDir::new().unwrap();
        let source = seeded();

        let (path, exported) = export_to_file(&source, temp.path(), now()).unwrap();
        assert_eq!(path, temp.path().join("sticker-backup-2026-10-16.json"));

        let imported = import_from_file(&path, now()).unwrap();
        assert_eq!(imported, exported);

        let target = MemoryStore::new();
        restore(&target, &imported).unwrap();
        assert_eq!(storage::load_tasks(&target, now()).unwrap(), exported.todos);
        assert_eq!(storage::load_profile(&target).unwrap().xp, 60);
    }

    #[test]
    fn failed_restore_rolls_back() {
        let store = FailingStore {
            inner: seeded(),
            fail_key: SETTINGS_KEY,
        };
        let before_tasks = store.get(TODOS_KEY).unwrap();
        let before_profile = store.get(PROFILE_KEY).unwrap();

        let backup = Backup {
            version: BACKUP_VERSION.to_string(),
            timestamp: now(),
            todos: Vec::new(),
            profile: Profile::default(),
            settings: Settings::default(),
        };
        let result = restore(&store, &backup);

        assert!(matches!(result, Err(Error::OperationFailed(_))));
        assert_eq!(store.get(TODOS_KEY).unwrap(), before_tasks);
        assert_eq!(store.get(PROFILE_KEY).unwrap(), before_profile);
        assert!(store.get(SETTINGS_KEY).unwrap().is_none());
    }

    #[test]
    fn auto_backup_respects_interval() {
        let store = seeded();

        assert!(auto_backup(&store, now(), 7).unwrap().is_some());
        assert_eq!(last_auto_backup(&store).unwrap(), Some(now()));

        let soon = now() + Duration::days(6);
        assert!(auto_backup(&store, soon, 7).unwrap().is_none());

        let later = now() + Duration::days(7);
        assert!(auto_backup(&store, later, 7).unwrap().is_some());

        let stored = load_auto_backup(&store, later).unwrap().unwrap();
        assert_eq!(stored.timestamp, later);
        assert_eq!(stored.todos.len(), 1);
    }

    #[test]
    fn invalid_auto_backup_is_ignored() {
        let store = MemoryStore::new();
        store.set(AUTO_BACKUP_KEY, &json!({ "version": "1.0.0" })).unwrap();
        assert!(load_auto_backup(&store, now()).unwrap().is_none());
    }
}
