//! sticker - gamified to-do list library
//!
//! The core is a set of pure functions over plain records: every list or
//! profile operation takes the current state and returns the next one, with
//! the clock passed in. Persistence and the command-line host sit on top.
//!
//! # Core Concepts
//!
//! - **Tasks**: ordered list, pinned tasks shown first
//! - **Age buckets**: how long a task has waited, and the XP it is worth
//! - **Progression**: streaks, XP and levels, daily stats, achievements
//! - **Backups**: versioned envelopes of the whole state
//!
//! # Module Organization
//!
//! - `task`: list transforms, validation, repair of stored records
//! - `age`: age buckets, badges and completion XP
//! - `progression`: profile, streak, levels and achievements
//! - `settings`: user preferences
//! - `focus`: focus sessions and their tiers
//! - `storage`: key-value persistence (`KvStore`, `FileStore`, `MemoryStore`)
//! - `lock`: file locking and atomic writes
//! - `backup`: export, import, restore and automatic backups
//! - `config`: configuration loading from `.sticker.toml`
//! - `events`: JSONL event output
//! - `output`: human and JSON command output
//! - `cli`: command-line interface using clap
//! - `error`: error types and result aliases

pub mod age;
pub mod backup;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod focus;
pub mod lock;
pub mod output;
pub mod progression;
pub mod settings;
pub mod storage;
pub mod task;

pub use error::{Error, Result};
