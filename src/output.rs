//! Command output: a human-readable block or a JSON envelope on stdout.
//!
//! Human output looks like
//!
//! ```text
//! Task completed
//!   Text  water plants
//!   XP    +15
//!
//!   Level up! Now level 2
//!
//! warning: auto backup failed: disk full
//! next: sticker list
//! ```
//!
//! With `--json` every command prints one envelope carrying
//! `schema_version`, `command`, `status` and either `data` or `error`.

use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};

pub const SCHEMA_VERSION: &str = "sticker.v1";

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

/// Human rendering of one command result.
#[derive(Debug, Clone)]
pub struct HumanOutput {
    header: String,
    summary: Vec<(String, String)>,
    details: Vec<String>,
    warnings: Vec<String>,
    next_steps: Vec<String>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            summary: Vec::new(),
            details: Vec::new(),
            warnings: Vec::new(),
            next_steps: Vec::new(),
        }
    }

    /// Aligned `key value` row under the header.
    pub fn push_summary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.summary.push((key.into(), value.into()));
    }

    /// Free-form line, e.g. one task or one achievement.
    pub fn push_detail(&mut self, value: impl Into<String>) {
        self.details.push(value.into());
    }

    pub fn push_warning(&mut self, value: impl Into<String>) {
        self.warnings.push(value.into());
    }

    pub fn push_next_step(&mut self, value: impl Into<String>) {
        self.next_steps.push(value.into());
    }
}

impl fmt::Display for HumanOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header)?;

        let width = self
            .summary
            .iter()
            .map(|(key, _)| key.chars().count())
            .max()
            .unwrap_or(0);
        for (key, value) in &self.summary {
            if value.is_empty() {
                write!(f, "\n  {key}")?;
            } else {
                write!(f, "\n  {key:<width$}  {value}")?;
            }
        }

        if !self.details.is_empty() {
            writeln!(f)?;
            for detail in &self.details {
                write!(f, "\n  {detail}")?;
            }
        }

        if !self.warnings.is_empty() || !self.next_steps.is_empty() {
            writeln!(f)?;
        }
        for warning in &self.warnings {
            write!(f, "\nwarning: {warning}")?;
        }
        for step in &self.next_steps {
            write!(f, "\nnext: {step}")?;
        }
        Ok(())
    }
}

pub fn format_human(output: &HumanOutput) -> String {
    output.to_string()
}

#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
enum Status {
    Success,
    Error,
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    code: i32,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorBody>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    next_steps: Vec<String>,
}

fn print_envelope<T: Serialize>(envelope: &Envelope<'_, T>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(envelope)?);
    Ok(())
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        return print_envelope(&Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: Status::Success,
            data: Some(data),
            error: None,
            warnings: human.map(|h| h.warnings.clone()).unwrap_or_default(),
            next_steps: human.map(|h| h.next_steps.clone()).unwrap_or_default(),
        });
    }

    if let Some(human) = human.filter(|_| !options.quiet) {
        println!("{human}");
    }
    Ok(())
}

/// Report a failed command: an envelope on stdout with `--json`, otherwise
/// `error:` and an optional `hint:` line on stderr.
pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let next_steps = error_next_steps(err);
    if !json {
        eprintln!("error: {err}");
        if let Some(hint) = next_steps.first() {
            eprintln!("hint: {hint}");
        }
        return Ok(());
    }

    print_envelope::<()>(&Envelope {
        schema_version: SCHEMA_VERSION,
        command,
        status: Status::Error,
        data: None,
        error: Some(ErrorBody {
            message: err.to_string(),
            code: err.exit_code(),
            kind: error_kind(err),
            details: err.details(),
        }),
        warnings: Vec::new(),
        next_steps,
    })
}

/// Best-effort command name for error envelopes, read before clap parses.
pub fn infer_command_name_from_args() -> String {
    command_name_from(std::env::args().skip(1))
}

fn command_name_from(args: impl IntoIterator<Item = String>) -> String {
    let mut args = args.into_iter();
    let mut positional = || {
        let mut skip_value = false;
        for arg in args.by_ref() {
            if skip_value {
                skip_value = false;
                continue;
            }
            if matches!(arg.as_str(), "--data-dir" | "--events") {
                skip_value = true;
                continue;
            }
            if arg.starts_with('-') {
                continue;
            }
            return Some(arg);
        }
        None
    };

    let Some(command) = positional() else {
        return "sticker".to_string();
    };

    if matches!(command.as_str(), "settings" | "focus" | "backup") {
        if let Some(sub) = positional() {
            return format!("{command} {sub}");
        }
    }
    command
}

fn error_kind(err: &Error) -> &'static str {
    match err {
        Error::TaskNotFound(_) => "task_not_found",
        Error::InvalidBackup(_) => "invalid_backup",
        Error::LockFailed(_) => "lock_failed",
        _ if err.exit_code() == crate::error::exit_codes::USER_ERROR => "user_error",
        _ => "operation_failed",
    }
}

fn error_next_steps(err: &Error) -> Vec<String> {
    match err {
        Error::TaskNotFound(_) => vec!["sticker list".to_string()],
        Error::InvalidConfig(_) => vec!["fix .sticker.toml then retry".to_string()],
        Error::InvalidBackup(_) => {
            vec!["check the file was written by `sticker backup export`".to_string()]
        }
        Error::LockFailed(_) => vec!["another sticker process is busy; retry".to_string()],
        _ => Vec::new(),
    }
}
