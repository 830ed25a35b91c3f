//! Command-line interface for sticker
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is implemented in its own submodule.

use std::path::PathBuf;

use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::backup;
use crate::config::Config;
use crate::error::Result;
use crate::events::{Event, EventDestination, EventKind, EventSink};
use crate::output::OutputOptions;
use crate::progression;
use crate::storage::{self, FileStore};

mod backup_cmd;
mod focus;
mod profile;
mod settings;
mod task;

/// sticker - a gamified to-do list
///
/// Tasks earn XP when completed, streaks count consecutive days and
/// achievements unlock along the way. Data lives in a local directory of
/// JSON files.
#[derive(Parser, Debug)]
#[command(name = "sticker")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory (defaults to the platform data dir)
    #[arg(long, global = true, env = "STICKER_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit JSONL events to a file, or `-` for stdout
    #[arg(long, global = true, value_name = "PATH")]
    pub events: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a task to the top of the list
    Add {
        /// Task text (1-200 characters)
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Emoji shown next to the task
        #[arg(long)]
        emoji: Option<String>,
    },

    /// List tasks, pinned first
    #[command(alias = "ls")]
    List {
        /// Status filter: all, active, completed
        #[arg(long, default_value = "all")]
        filter: String,

        /// Case-insensitive text search
        #[arg(long, short)]
        search: Option<String>,
    },

    /// Toggle a task's completion; completing earns XP
    Done {
        /// Task id, id prefix, or list position
        task: String,
    },

    /// Delete a task
    Rm {
        /// Task id, id prefix, or list position
        task: String,
    },

    /// Reorder a task
    Mv {
        /// Task id, id prefix, or list position
        task: String,

        /// Swap with the neighbour: up or down
        direction: Option<String>,

        /// Move to the position of another task
        #[arg(long, conflicts_with_all = ["direction", "end"])]
        to: Option<String>,

        /// Move to the bottom of the list
        #[arg(long, conflicts_with = "direction")]
        end: bool,
    },

    /// Replace a task's text
    Edit {
        /// Task id, id prefix, or list position
        task: String,

        /// New text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Toggle a task's pin
    Pin {
        /// Task id, id prefix, or list position
        task: String,
    },

    /// Hide a task's age badge until a later time (default: tomorrow)
    Postpone {
        /// Task id, id prefix, or list position
        task: String,

        /// RFC 3339 timestamp to postpone until
        #[arg(long)]
        until: Option<String>,
    },

    /// Remove every completed task
    Clear,

    /// Pick a random active task
    Pick,

    /// Show level, XP and streak
    Profile,

    /// List achievements and which are unlocked
    Achievements,

    /// Show or change preferences
    #[command(subcommand)]
    Settings(SettingsCommands),

    /// Focus session tracking
    #[command(subcommand)]
    Focus(FocusCommands),

    /// Export, import and automatic backups
    #[command(subcommand)]
    Backup(BackupCommands),
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommands {
    /// Show all settings, or one key
    Get {
        /// Setting key (camelCase, e.g. soundEnabled)
        key: Option<String>,
    },

    /// Change one setting
    Set {
        /// Setting key (camelCase, e.g. soundEnabled)
        key: String,

        /// New value
        value: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum FocusCommands {
    /// Start a focus session, or record activity on the running one
    On,

    /// End the focus session
    Off,

    /// Show the running session
    Status,
}

#[derive(Subcommand, Debug)]
pub enum BackupCommands {
    /// Write a backup file
    Export {
        /// Output file or directory (defaults to the current directory)
        path: Option<PathBuf>,
    },

    /// Restore from a backup file, replacing current data
    Import {
        /// Backup file to restore
        #[arg(required_unless_present = "auto", conflicts_with = "auto")]
        file: Option<PathBuf>,

        /// Restore the stored automatic backup instead of a file
        #[arg(long)]
        auto: bool,
    },

    /// Take an automatic backup if one is due
    Auto {
        /// Take one even if the interval has not passed
        #[arg(long)]
        force: bool,
    },
}

/// Global flags shared by every command.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub data_dir: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
    pub events: Option<String>,
}

/// Open store, configuration and event sink for one command.
pub(crate) struct Context {
    pub store: FileStore,
    pub config: Config,
    events: Option<EventSink>,
    events_to_stdout: bool,
    json: bool,
    quiet: bool,
    warnings: Vec<String>,
}

#[derive(Serialize)]
struct AutoBackupData {
    timestamp: chrono::DateTime<Utc>,
    todos: usize,
}

impl Context {
    pub fn open(global: &GlobalOptions) -> Result<Self> {
        Self::open_with(global, true)
    }

    /// Backup commands manage the automatic backup themselves.
    pub fn open_without_auto_backup(global: &GlobalOptions) -> Result<Self> {
        Self::open_with(global, false)
    }

    fn open_with(global: &GlobalOptions, auto_backup: bool) -> Result<Self> {
        let data_dir = storage::resolve_data_dir(global.data_dir.as_deref())?;
        std::fs::create_dir_all(&data_dir)?;
        let config = Config::load_from_dir(&data_dir);
        let store = FileStore::new(&data_dir).with_lock_timeout(config.storage.lock_timeout_ms);

        let destination = EventDestination::parse(global.events.as_deref());
        let events = destination.as_ref().map(|dest| dest.open()).transpose()?;
        let events_to_stdout = matches!(destination, Some(EventDestination::Stdout));

        tracing::debug!(data_dir = %data_dir.display(), "opened data directory");

        let mut ctx = Self {
            store,
            config,
            events,
            events_to_stdout,
            json: global.json,
            quiet: global.quiet,
            warnings: Vec::new(),
        };
        ctx.startup(auto_backup)?;
        Ok(ctx)
    }

    /// Streak reconciliation and the automatic backup, as on app launch.
    fn startup(&mut self, auto_backup: bool) -> Result<()> {
        let profile = storage::load_profile(&self.store)?;
        let reconciled = progression::reconcile_streak(&profile, Local::now().date_naive());
        if reconciled != profile {
            tracing::info!(streak = profile.streak, "streak broken, resetting");
            storage::save_profile(&self.store, &reconciled)?;
        }

        let interval = self.config.backup.auto_interval_days;
        if !auto_backup || interval == 0 {
            return Ok(());
        }
        match backup::auto_backup(&self.store, Utc::now(), interval) {
            Ok(Some(taken)) => {
                let data = AutoBackupData {
                    timestamp: taken.timestamp,
                    todos: taken.todos.len(),
                };
                self.emit(EventKind::AutoBackupCreated, &data);
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(error = %err, "auto backup failed");
                self.warnings.push(format!("auto backup failed: {err}"));
            }
        }
        Ok(())
    }

    pub fn output(&self) -> OutputOptions {
        OutputOptions {
            json: self.json && !self.events_to_stdout,
            quiet: self.quiet || self.events_to_stdout,
        }
    }

    /// Emit one event; failures become warnings rather than errors.
    pub fn emit<T: Serialize>(&mut self, kind: EventKind, data: &T) {
        let Some(sink) = self.events.as_mut() else {
            return;
        };
        let result = Event::new(kind)
            .with_data(data)
            .and_then(|event| sink.emit(&event));
        if let Err(err) = result {
            self.warnings.push(format!("event output failed: {err}"));
        }
    }

    /// Warnings collected so far, drained for the command output.
    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }
}

impl Cli {
    fn global(&self) -> GlobalOptions {
        GlobalOptions {
            data_dir: self.data_dir.clone(),
            json: self.json,
            quiet: self.quiet,
            events: self.events.clone(),
        }
    }

    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let global = self.global();
        match self.command {
            Commands::Add { text, emoji } => task::run_add(task::AddOptions {
                text: text.join(" "),
                emoji,
                global,
            }),
            Commands::List { filter, search } => task::run_list(task::ListOptions {
                filter,
                search,
                global,
            }),
            Commands::Done { task } => task::run_done(task::TargetOptions { task, global }),
            Commands::Rm { task } => task::run_rm(task::TargetOptions { task, global }),
            Commands::Mv {
                task,
                direction,
                to,
                end,
            } => task::run_mv(task::MoveOptions {
                task,
                direction,
                to,
                end,
                global,
            }),
            Commands::Edit { task, text } => task::run_edit(task::EditOptions {
                task,
                text: text.join(" "),
                global,
            }),
            Commands::Pin { task } => task::run_pin(task::TargetOptions { task, global }),
            Commands::Postpone { task, until } => task::run_postpone(task::PostponeOptions {
                task,
                until,
                global,
            }),
            Commands::Clear => task::run_clear(global),
            Commands::Pick => task::run_pick(global),
            Commands::Profile => profile::run_profile(global),
            Commands::Achievements => profile::run_achievements(global),
            Commands::Settings(cmd) => match cmd {
                SettingsCommands::Get { key } => {
                    settings::run_get(settings::GetOptions { key, global })
                }
                SettingsCommands::Set { key, value } => {
                    settings::run_set(settings::SetOptions { key, value, global })
                }
            },
            Commands::Focus(cmd) => match cmd {
                FocusCommands::On => focus::run_on(global),
                FocusCommands::Off => focus::run_off(global),
                FocusCommands::Status => focus::run_status(global),
            },
            Commands::Backup(cmd) => match cmd {
                BackupCommands::Export { path } => {
                    backup_cmd::run_export(backup_cmd::ExportOptions { path, global })
                }
                BackupCommands::Import { file, auto } => {
                    backup_cmd::run_import(backup_cmd::ImportOptions { file, auto, global })
                }
                BackupCommands::Auto { force } => {
                    backup_cmd::run_auto(backup_cmd::AutoOptions { force, global })
                }
            },
        }
    }
}
