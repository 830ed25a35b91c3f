#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// A throwaway data directory for one test.
pub struct DataDir {
    dir: TempDir,
}

impl DataDir {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of the JSON document stored under `key`.
    pub fn doc_path(&self, key: &str) -> PathBuf {
        self.dir.path().join(format!("{key}.json"))
    }

    pub fn read_doc(&self, key: &str) -> Result<Value, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(self.doc_path(key))?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn write_doc(&self, key: &str, value: &Value) -> std::io::Result<()> {
        fs::write(self.doc_path(key), serde_json::to_string_pretty(value)?)
    }

    pub fn write_file(&self, rel_path: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// `sticker` bound to this data directory, run from inside it.
    pub fn cmd(&self) -> Command {
        let mut cmd = sticker_cmd();
        cmd.env("STICKER_DATA_DIR", self.dir.path());
        cmd.current_dir(self.dir.path());
        cmd
    }

    /// Run a command with `--json` and return the parsed envelope.
    pub fn json(&self, args: &[&str]) -> Result<Value, Box<dyn std::error::Error>> {
        let output = self.cmd().args(args).arg("--json").output()?;
        if !output.status.success() {
            return Err(format!(
                "sticker {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stdout)
            )
            .into());
        }
        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

pub fn sticker_cmd() -> Command {
    let mut cmd = Command::cargo_bin("sticker").expect("binary");
    cmd.env_remove("STICKER_DATA_DIR");
    cmd.env_remove("RUST_LOG");
    cmd
}
