//! Key-value persistence for sticker state.
//!
//! Each key is one JSON document. On disk the data directory holds one file
//! per key:
//!
//! ```text
//! <data-dir>/
//!   .sticker.toml                # Optional configuration
//!   todos.json                   # Task list
//!   todo-profile.json            # Progression profile
//!   todo-settings.json           # Preferences
//!   focus-session.json           # Running focus session, if any
//!   auto-backup.json             # Latest automatic backup envelope
//!   last-auto-backup.json        # Timestamp of that backup
//!   <key>.json.lock              # Advisory lock per key
//! ```
//!
//! The typed `load_*` helpers never fail on bad data: a blob that does not
//! decode is logged and replaced by the default value.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::focus::FocusSession;
use crate::lock::{self, FileLock, DEFAULT_LOCK_TIMEOUT_MS};
use crate::progression::Profile;
use crate::settings::Settings;
use crate::task::{self, StoredTask, Task};

pub const TODOS_KEY: &str = "todos";
pub const PROFILE_KEY: &str = "todo-profile";
pub const SETTINGS_KEY: &str = "todo-settings";
pub const FOCUS_SESSION_KEY: &str = "focus-session";
pub const AUTO_BACKUP_KEY: &str = "auto-backup";
pub const LAST_AUTO_BACKUP_KEY: &str = "last-auto-backup";

/// Persistence adapter: opaque JSON blobs addressed by key.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&self, key: &str, value: &Value) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// One `<key>.json` file per key inside a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    lock_timeout_ms: u64,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }

    pub fn with_lock_timeout(mut self, timeout_ms: u64) -> Self {
        self.lock_timeout_ms = timeout_ms;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`.
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let path = self.path_for(key)?;
        let Some(bytes) = lock::read_locked(&path, self.lock_timeout_ms)? else {
            return Ok(None);
        };
        let value = serde_json::from_slice(&bytes)?;
        Ok(Some(value))
    }

    fn set(&self, key: &str, value: &Value) -> Result<()> {
        let path = self.path_for(key)?;
        let json = serde_json::to_string_pretty(value)?;
        lock::write_atomic_locked(&path, json.as_bytes(), self.lock_timeout_ms)?;
        tracing::debug!(key, path = %path.display(), "stored");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let _lock = FileLock::acquire(lock::lock_path_for(&path), self.lock_timeout_ms)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::Io(err)),
        }
    }
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Value>>> {
        self.entries
            .lock()
            .map_err(|_| Error::OperationFailed("memory store poisoned".to_string()))
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &Value) -> Result<()> {
        validate_key(key)?;
        self.entries()?.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}

/// Keys become file names, so only `[a-z0-9_-]` is allowed.
fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' || ch == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!("invalid storage key '{key}'")))
    }
}

/// Resolve the data directory: explicit path, else the platform data dir.
pub fn resolve_data_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    ProjectDirs::from("", "", "sticker")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            Error::OperationFailed(
                "could not determine a data directory; pass --data-dir".to_string(),
            )
        })
}

pub fn save_json<S: KvStore + ?Sized, T: Serialize>(store: &S, key: &str, value: &T) -> Result<()> {
    store.set(key, &serde_json::to_value(value)?)
}

/// Decode `key`, falling back to `T::default()` when missing or malformed.
pub fn load_or_default<S, T>(store: &S, key: &str) -> Result<T>
where
    S: KvStore + ?Sized,
    T: DeserializeOwned + Default,
{
    Ok(load_optional(store, key)?.unwrap_or_default())
}

/// Decode `key`; malformed data is logged and treated as absent.
pub fn load_optional<S, T>(store: &S, key: &str) -> Result<Option<T>>
where
    S: KvStore + ?Sized,
    T: DeserializeOwned,
{
    let value = match store.get(key) {
        Ok(Some(value)) => value,
        Ok(None) => return Ok(None),
        Err(Error::Json(err)) => {
            tracing::warn!(key, error = %err, "stored value is not valid JSON, using default");
            return Ok(None);
        }
        Err(err) => return Err(err),
    };
    match serde_json::from_value(value) {
        Ok(decoded) => Ok(Some(decoded)),
        Err(err) => {
            tracing::warn!(key, error = %err, "stored value has the wrong shape, using default");
            Ok(None)
        }
    }
}

/// Load the task list, repairing records and writing the repaired list back.
pub fn load_tasks<S: KvStore + ?Sized>(store: &S, now: DateTime<Utc>) -> Result<Vec<Task>> {
    let Some(Value::Array(items)) = load_optional::<S, Value>(store, TODOS_KEY)? else {
        return Ok(Vec::new());
    };

    let mut stored = Vec::with_capacity(items.len());
    let mut dropped = 0usize;
    for item in items {
        match StoredTask::from_entry(item) {
            Some(record) => stored.push(record),
            None => {
                dropped += 1;
                tracing::warn!("dropping task entry that is not an object");
            }
        }
    }

    let (tasks, issues) = task::repair(stored, now);
    for issue in &issues {
        tracing::warn!(issue = %issue, "repaired task record");
    }
    if dropped > 0 || !issues.is_empty() {
        tracing::info!(dropped, repaired = issues.len(), "saving repaired task list");
        save_tasks(store, &tasks)?;
    }
    Ok(tasks)
}

pub fn save_tasks<S: KvStore + ?Sized>(store: &S, tasks: &[Task]) -> Result<()> {
    save_json(store, TODOS_KEY, &tasks)
}

pub fn load_profile<S: KvStore + ?Sized>(store: &S) -> Result<Profile> {
    Ok(load_or_default::<S, Profile>(store, PROFILE_KEY)?.sanitized())
}

pub fn save_profile<S: KvStore + ?Sized>(store: &S, profile: &Profile) -> Result<()> {
    save_json(store, PROFILE_KEY, profile)
}

/// Persist a completion: the profile first, then the task list. If the task
/// list cannot be written the `previous` profile is put back.
pub fn save_completion<S: KvStore + ?Sized>(
    store: &S,
    tasks: &[Task],
    profile: &Profile,
    previous: &Profile,
) -> Result<()> {
    save_profile(store, profile)?;
    if let Err(err) = save_tasks(store, tasks) {
        tracing::error!(error = %err, "saving tasks failed, restoring profile");
        if let Err(rollback_err) = save_profile(store, previous) {
            return Err(Error::OperationFailed(format!(
                "saving tasks failed ({err}) and profile rollback failed ({rollback_err})"
            )));
        }
        return Err(err);
    }
    Ok(())
}

pub fn load_settings<S: KvStore + ?Sized>(store: &S) -> Result<Settings> {
    Ok(load_or_default::<S, Settings>(store, SETTINGS_KEY)?.sanitized())
}

pub fn save_settings<S: KvStore + ?Sized>(store: &S, settings: &Settings) -> Result<()> {
    save_json(store, SETTINGS_KEY, settings)
}

pub fn load_focus_session<S: KvStore + ?Sized>(store: &S) -> Result<Option<FocusSession>> {
    load_optional(store, FOCUS_SESSION_KEY)
}

pub fn save_focus_session<S: KvStore + ?Sized>(store: &S, session: &FocusSession) -> Result<()> {
    save_json(store, FOCUS_SESSION_KEY, session)
}

pub fn clear_focus_session<S: KvStore + ?Sized>(store: &S) -> Result<()> {
    store.remove(FOCUS_SESSION_KEY)
}
