//! sticker settings commands.

use serde::Serialize;

use crate::cli::{Context, GlobalOptions};
use crate::error::{Error, Result};
use crate::events::EventKind;
use crate::output::{emit_success, HumanOutput};
use crate::settings::Settings;
use crate::storage;

pub struct GetOptions {
    pub key: Option<String>,
    pub global: GlobalOptions,
}

pub struct SetOptions {
    pub key: String,
    pub value: String,
    pub global: GlobalOptions,
}

#[derive(Serialize)]
struct SettingChange<'a> {
    key: &'a str,
    value: serde_json::Value,
}

/// Settings as `(camelCase key, value)` pairs, sorted by key.
fn entries(settings: &Settings) -> Result<Vec<(String, serde_json::Value)>> {
    match serde_json::to_value(settings)? {
        serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
        _ => Err(Error::OperationFailed("settings did not serialize to an object".to_string())),
    }
}

fn display(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

pub fn run_get(options: GetOptions) -> Result<()> {
    let mut ctx = Context::open(&options.global)?;
    let settings = storage::load_settings(&ctx.store)?;
    let all = entries(&settings)?;

    let mut human = HumanOutput::new("Settings");
    for warning in ctx.take_warnings() {
        human.push_warning(warning);
    }

    match options.key {
        Some(key) => {
            let (key, value) = all
                .into_iter()
                .find(|(candidate, _)| *candidate == key)
                .ok_or_else(|| Error::InvalidArgument(format!("unknown setting '{key}'")))?;
            human.push_summary(key.clone(), display(&value));
            emit_success(
                ctx.output(),
                "settings get",
                &SettingChange { key: &key, value },
                Some(&human),
            )
        }
        None => {
            for (key, value) in &all {
                human.push_summary(key.clone(), display(value));
            }
            emit_success(ctx.output(), "settings get", &settings, Some(&human))
        }
    }
}

pub fn run_set(options: SetOptions) -> Result<()> {
    let mut ctx = Context::open(&options.global)?;
    let settings = storage::load_settings(&ctx.store)?;
    let next = settings.set(&options.key, &options.value)?;
    storage::save_settings(&ctx.store, &next)?;

    let value = entries(&next)?
        .into_iter()
        .find(|(key, _)| *key == options.key)
        .map(|(_, value)| value)
        .unwrap_or(serde_json::Value::Null);
    let change = SettingChange {
        key: &options.key,
        value,
    };
    ctx.emit(EventKind::SettingsChanged, &change);

    let mut human = HumanOutput::new("Setting updated");
    human.push_summary(options.key.clone(), display(&change.value));
    for warning in ctx.take_warnings() {
        human.push_warning(warning);
    }
    emit_success(ctx.output(), "settings set", &change, Some(&human))
}
