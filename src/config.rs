//! Configuration loading and management
//!
//! Handles parsing of `.sticker.toml` in the data directory.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::backup::DEFAULT_AUTO_INTERVAL_DAYS;
use crate::error::{Error, Result};
use crate::lock::DEFAULT_LOCK_TIMEOUT_MS;

/// Name of the configuration file inside the data directory
pub const CONFIG_FILE: &str = ".sticker.toml";

const MAX_AUTO_INTERVAL_DAYS: u32 = 365;
const MAX_LOCK_TIMEOUT_MS: u64 = 60_000;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Backup configuration
    #[serde(default)]
    pub backup: BackupConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Days between automatic backups; 0 disables them
    #[serde(default = "default_auto_interval_days")]
    pub auto_interval_days: u32,
}

fn default_auto_interval_days() -> u32 {
    DEFAULT_AUTO_INTERVAL_DAYS
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            auto_interval_days: default_auto_interval_days(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// How long to wait for another process's lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `.sticker.toml` from the data directory, falling back to defaults
    pub fn load_from_dir(data_dir: &Path) -> Self {
        let config_path = data_dir.join(CONFIG_FILE);
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %config_path.display(), error = %err, "ignoring config");
                Self::default()
            }
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.backup.auto_interval_days > MAX_AUTO_INTERVAL_DAYS {
            return Err(Error::InvalidConfig(format!(
                "backup.auto_interval_days must be <= {MAX_AUTO_INTERVAL_DAYS}"
            )));
        }
        if self.storage.lock_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "storage.lock_timeout_ms must be > 0".to_string(),
            ));
        }
        if self.storage.lock_timeout_ms > MAX_LOCK_TIMEOUT_MS {
            return Err(Error::InvalidConfig(format!(
                "storage.lock_timeout_ms must be <= {MAX_LOCK_TIMEOUT_MS}"
            )));
        }
        Ok(())
    }
}
