//! Event output for external integrations.
//!
//! Events are emitted as JSON lines to stdout or a file given with
//! `--events`. A status bar or notifier can tail the file to react to
//! completions, level-ups and unlocked achievements.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};

pub const EVENT_SCHEMA_VERSION: &str = "sticker.event.v1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventDestination {
    Stdout,
    File(PathBuf),
}

impl EventDestination {
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        raw.and_then(|value| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return None;
            }
            if trimmed == "-" {
                return Some(EventDestination::Stdout);
            }
            Some(EventDestination::File(PathBuf::from(trimmed)))
        })
    }

    pub fn open(&self) -> Result<EventSink> {
        match self {
            EventDestination::Stdout => Ok(EventSink::stdout()),
            EventDestination::File(path) => EventSink::file(path),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    TaskAdded,
    TaskCompleted,
    TaskReopened,
    TaskDeleted,
    TaskEdited,
    TaskMoved,
    TaskPinned,
    TaskUnpinned,
    TaskPostponed,
    CompletedCleared,
    XpGained,
    LevelUp,
    AchievementUnlocked,
    SettingsChanged,
    FocusStarted,
    FocusEnded,
    BackupExported,
    BackupRestored,
    AutoBackupCreated,
}

#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub schema_version: &'static str,
    pub event: EventKind,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Event {
    pub fn new(event: EventKind) -> Self {
        Self {
            schema_version: EVENT_SCHEMA_VERSION,
            event,
            timestamp: Utc::now(),
            data: None,
        }
    }

    pub fn with_data<T: Serialize>(mut self, data: T) -> Result<Self> {
        self.data = Some(serde_json::to_value(data)?);
        Ok(self)
    }
}

/// JSONL writer for events.
pub struct EventSink {
    writer: Box<dyn Write + Send>,
}

impl EventSink {
    pub fn stdout() -> Self {
        Self {
            writer: Box::new(std::io::stdout()),
        }
    }

    /// Append to `path`, creating it if necessary.
    pub fn file(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self {
            writer: Box::new(file),
        })
    }

    #[cfg(test)]
    fn buffer(writer: Box<dyn Write + Send>) -> Self {
        Self { writer }
    }

    pub fn emit(&mut self, event: &Event) -> Result<()> {
        let serialized = serde_json::to_vec(event)?;
        self.writer.write_all(&serialized)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush().map_err(Error::Io)?;
        Ok(())
    }

    pub fn emit_all(&mut self, events: &[Event]) -> Result<()> {
        for event in events {
            self.emit(event)?;
        }
        Ok(())
    }
}
