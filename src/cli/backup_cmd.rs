//! sticker backup commands.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::backup::{self, Backup};
use crate::cli::{Context, GlobalOptions};
use crate::error::{Error, Result};
use crate::events::EventKind;
use crate::output::{emit_success, HumanOutput};

pub struct ExportOptions {
    pub path: Option<PathBuf>,
    pub global: GlobalOptions,
}

pub struct ImportOptions {
    pub file: Option<PathBuf>,
    pub auto: bool,
    pub global: GlobalOptions,
}

pub struct AutoOptions {
    pub force: bool,
    pub global: GlobalOptions,
}

#[derive(Serialize)]
struct BackupSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<PathBuf>,
    version: String,
    timestamp: DateTime<Utc>,
    todos: usize,
    level: u32,
    achievements: usize,
}

impl BackupSummary {
    fn new(path: Option<PathBuf>, backup: &Backup) -> Self {
        Self {
            path,
            version: backup.version.clone(),
            timestamp: backup.timestamp,
            todos: backup.todos.len(),
            level: backup.profile.level,
            achievements: backup.profile.achievements.len(),
        }
    }

    fn push_human(&self, human: &mut HumanOutput) {
        if let Some(path) = &self.path {
            human.push_summary("File", path.display().to_string());
        }
        human.push_summary("Taken", self.timestamp.to_rfc3339());
        human.push_summary("Tasks", self.todos.to_string());
        human.push_summary("Level", self.level.to_string());
        human.push_summary("Achievements", self.achievements.to_string());
    }
}

#[derive(Serialize)]
struct AutoOutput {
    created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    backup: Option<BackupSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last: Option<DateTime<Utc>>,
}

pub fn run_export(options: ExportOptions) -> Result<()> {
    let mut ctx = Context::open_without_auto_backup(&options.global)?;
    let target = match options.path {
        Some(path) => path,
        None => std::env::current_dir()?,
    };

    let (path, taken) = backup::export_to_file(&ctx.store, &target, Utc::now())?;
    let summary = BackupSummary::new(Some(path), &taken);
    ctx.emit(EventKind::BackupExported, &summary);

    let mut human = HumanOutput::new("Backup exported");
    summary.push_human(&mut human);
    if let Some(path) = &summary.path {
        human.push_next_step(format!("sticker backup import {}", path.display()));
    }
    for warning in ctx.take_warnings() {
        human.push_warning(warning);
    }
    emit_success(ctx.output(), "backup export", &summary, Some(&human))
}

pub fn run_import(options: ImportOptions) -> Result<()> {
    let mut ctx = Context::open_without_auto_backup(&options.global)?;
    let now = Utc::now();

    let (source, incoming) = match (options.file, options.auto) {
        (Some(file), false) => {
            let incoming = backup::import_from_file(&file, now)?;
            (Some(file), incoming)
        }
        (None, true) => {
            let incoming = backup::load_auto_backup(&ctx.store, now)?
                .ok_or_else(|| Error::InvalidBackup("no automatic backup stored".to_string()))?;
            (None, incoming)
        }
        _ => {
            return Err(Error::InvalidArgument(
                "give a backup file or --auto".to_string(),
            ))
        }
    };

    backup::restore(&ctx.store, &incoming)?;
    let summary = BackupSummary::new(source, &incoming);
    ctx.emit(EventKind::BackupRestored, &summary);

    let mut human = HumanOutput::new("Backup restored");
    summary.push_human(&mut human);
    for warning in ctx.take_warnings() {
        human.push_warning(warning);
    }
    emit_success(ctx.output(), "backup import", &summary, Some(&human))
}

pub fn run_auto(options: AutoOptions) -> Result<()> {
    let mut ctx = Context::open_without_auto_backup(&options.global)?;
    let interval = if options.force {
        0
    } else {
        ctx.config.backup.auto_interval_days
    };

    let taken = if options.force || interval > 0 {
        backup::auto_backup(&ctx.store, Utc::now(), interval)?
    } else {
        None
    };
    let output = AutoOutput {
        created: taken.is_some(),
        backup: taken.as_ref().map(|taken| BackupSummary::new(None, taken)),
        last: backup::last_auto_backup(&ctx.store)?,
    };
    if let Some(summary) = &output.backup {
        ctx.emit(EventKind::AutoBackupCreated, summary);
    }

    let mut human = match &output.backup {
        Some(summary) => {
            let mut human = HumanOutput::new("Automatic backup stored");
            summary.push_human(&mut human);
            human
        }
        None => {
            let mut human = HumanOutput::new("Automatic backup not due");
            if let Some(last) = output.last {
                human.push_summary("Last", last.to_rfc3339());
            }
            human.push_summary("Interval", format!("{interval} day(s)"));
            human.push_next_step("sticker backup auto --force");
            human
        }
    };
    for warning in ctx.take_warnings() {
        human.push_warning(warning);
    }
    emit_success(ctx.output(), "backup auto", &output, Some(&human))
}
