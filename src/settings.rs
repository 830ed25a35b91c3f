//! User preferences.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const THEMES: [&str; 6] = ["default", "pink", "orange", "green", "purple", "mint"];
pub const OPACITY_MAX: u8 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub theme: String,
    pub sound_enabled: bool,
    pub notification_enabled: bool,
    pub opacity: u8,
    pub always_on_top: bool,
    pub minimal_mode: bool,
    pub profile_collapsed: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: THEMES[0].to_string(),
            sound_enabled: true,
            notification_enabled: true,
            opacity: OPACITY_MAX,
            always_on_top: true,
            minimal_mode: false,
            profile_collapsed: false,
        }
    }
}

impl Settings {
    /// Clamp opacity and fall back to the default theme when unknown.
    pub fn sanitized(&self) -> Settings {
        let mut next = self.clone();
        next.opacity = next.opacity.min(OPACITY_MAX);
        if !THEMES.contains(&next.theme.as_str()) {
            next.theme = THEMES[0].to_string();
        }
        next
    }

    /// Return a copy with one key changed. Keys use the stored camelCase names.
    pub fn set(&self, key: &str, value: &str) -> Result<Settings> {
        let mut next = self.clone();
        let value = value.trim();
        match key {
            "theme" => {
                let theme = value.to_ascii_lowercase();
                if !THEMES.contains(&theme.as_str()) {
                    return Err(Error::InvalidArgument(format!(
                        "unknown theme '{value}' (expected one of {})",
                        THEMES.join(", ")
                    )));
                }
                next.theme = theme;
            }
            "opacity" => {
                let opacity: u8 = value.parse().map_err(|_| {
                    Error::InvalidArgument(format!("opacity must be 0-100, got '{value}'"))
                })?;
                if opacity > OPACITY_MAX {
                    return Err(Error::InvalidArgument(format!(
                        "opacity must be 0-100, got {opacity}"
                    )));
                }
                next.opacity = opacity;
            }
            "soundEnabled" => next.sound_enabled = parse_bool(key, value)?,
            "notificationEnabled" => next.notification_enabled = parse_bool(key, value)?,
            "alwaysOnTop" => next.always_on_top = parse_bool(key, value)?,
            "minimalMode" => next.minimal_mode = parse_bool(key, value)?,
            "profileCollapsed" => next.profile_collapsed = parse_bool(key, value)?,
            other => {
                return Err(Error::InvalidArgument(format!("unknown setting '{other}'")));
            }
        }
        Ok(next)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => Err(Error::InvalidArgument(format!(
            "{key} expects true/false, got '{value}'"
        ))),
    }
}
