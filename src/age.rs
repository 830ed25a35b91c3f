//! Task age buckets and completion rewards.
//!
//! Everything here is a pure function of `created_at` and an explicit `now`,
//! so callers decide which clock to read.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::task::Task;

const SECS_PER_HOUR: f64 = 3600.0;
const HOURS_PER_DAY: f64 = 24.0;

/// Reward for finishing within the first hour.
pub const XP_SPEED_BONUS: u32 = 15;
/// Reward for an ordinary completion.
pub const XP_BASELINE: u32 = 10;
/// Reward once a task has waited longer than [`XP_STALE_AFTER_HOURS`].
pub const XP_STALE: u32 = 5;
pub const XP_STALE_AFTER_HOURS: f64 = 48.0;

/// Display bucket for how long a task has been waiting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgeBucket {
    pub text: String,
    /// Severity in `0..=5`, non-decreasing with age.
    pub level: u8,
}

/// Badge shown next to an open task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Badge {
    Postponed { until: DateTime<Utc> },
    Age(AgeBucket),
}

/// Hours between creation and `now`; clock skew clamps to zero.
pub fn age_hours(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let millis = (now - created_at).num_milliseconds();
    if millis <= 0 {
        return 0.0;
    }
    millis as f64 / 1000.0 / SECS_PER_HOUR
}

pub fn age_bucket(created_at: DateTime<Utc>, now: DateTime<Utc>) -> AgeBucket {
    let hours = age_hours(created_at, now);
    let days = hours / HOURS_PER_DAY;
    let whole_hours = hours.floor() as u64;
    let whole_days = days.floor() as u64;

    let (level, text) = if hours < 1.0 {
        (0, "just now".to_string())
    } else if hours < 2.0 {
        (1, "1 hour ago".to_string())
    } else if hours < 12.0 {
        // 2h..6h and 6h..12h share a level
        (2, format!("{whole_hours} hours ago"))
    } else if hours < 24.0 {
        (3, format!("{whole_hours} hours ago"))
    } else if hours < 48.0 {
        (3, "yesterday".to_string())
    } else if days < 7.0 {
        (4, format!("{whole_days} days ago"))
    } else if days < 14.0 {
        (4, "1 week ago".to_string())
    } else if days < 30.0 {
        (5, format!("{} weeks ago", whole_days / 7))
    } else {
        let months = whole_days / 30;
        if months == 1 {
            (5, "1 month ago".to_string())
        } else {
            (5, format!("{months} months ago"))
        }
    };

    AgeBucket {
        text,
        level,
    }
}

/// XP granted for completing a task created at `created_at`.
pub fn xp_for_completion(created_at: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let hours = age_hours(created_at, now);
    if hours < 1.0 {
        XP_SPEED_BONUS
    } else if hours > XP_STALE_AFTER_HOURS {
        XP_STALE
    } else {
        XP_BASELINE
    }
}

pub fn is_postponed(task: &Task, now: DateTime<Utc>) -> bool {
    task.postponed_until.map(|until| now < until).unwrap_or(false)
}

pub fn badge(task: &Task, now: DateTime<Utc>) -> Badge {
    match task.postponed_until {
        Some(until) if now < until => Badge::Postponed { until },
        _ => Badge::Age(age_bucket(task.created_at, now)),
    }
}
