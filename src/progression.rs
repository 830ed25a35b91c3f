//! Profile progression: streaks, XP and levels, daily stats, achievements.
//!
//! Functions take a `&Profile` and return the next profile by value. Calendar
//! days are supplied by the caller, already converted to the user's local
//! time zone.

use chrono::{DateTime, NaiveDate, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::age;
use crate::task::Task;

/// XP needed to leave each level, indexed by level.
pub const LEVEL_THRESHOLDS: [u64; 11] = [0, 100, 250, 450, 700, 1000, 1400, 1850, 2350, 2900, 3500];

/// First level without a threshold entry; leveling stops here.
pub const MAX_LEVEL: u32 = LEVEL_THRESHOLDS.len() as u32;

const EARLY_BIRD_BEFORE_HOUR: u32 = 6;
const NIGHT_OWL_BEFORE_HOUR: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    pub level: u32,
    pub xp: u64,
    #[serde(rename = "totalXP")]
    pub total_xp: u64,
    pub streak: u32,
    pub max_streak: u32,
    #[serde(with = "day_key")]
    pub last_completed_date: Option<NaiveDate>,
    pub total_completed: u64,
    pub achievements: Vec<String>,
    pub early_bird: bool,
    pub night_owl: bool,
    pub daily_completed: u32,
    pub max_daily_completed: u32,
    #[serde(with = "day_key")]
    pub daily_date: Option<NaiveDate>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            level: 1,
            xp: 0,
            total_xp: 0,
            streak: 0,
            max_streak: 0,
            last_completed_date: None,
            total_completed: 0,
            achievements: Vec::new(),
            early_bird: false,
            night_owl: false,
            daily_completed: 0,
            max_daily_completed: 0,
            daily_date: None,
        }
    }
}

impl Profile {
    pub fn has_achievement(&self, id: &str) -> bool {
        self.achievements.iter().any(|existing| existing == id)
    }

    /// XP still needed for the next level, `None` at the max level.
    pub fn xp_to_next_level(&self) -> Option<u64> {
        level_threshold(self.level).map(|threshold| threshold.saturating_sub(self.xp))
    }

    /// Repair a profile read from storage so the invariants hold again.
    pub fn sanitized(&self) -> Profile {
        let mut next = self.clone();
        next.level = next.level.clamp(1, MAX_LEVEL);
        next.max_streak = next.max_streak.max(next.streak);
        next.max_daily_completed = next.max_daily_completed.max(next.daily_completed);

        let mut seen = std::collections::HashSet::new();
        next.achievements.retain(|id| seen.insert(id.clone()));

        fold_levels(&mut next);
        next
    }
}

/// Calendar day serialization: `YYYY-MM-DD`, with the legacy
/// `Date.toDateString()` form accepted on input.
mod day_key {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(day) => serializer.serialize_some(&day.format("%Y-%m-%d").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(super::parse_day))
    }
}

pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%a %b %d %Y"))
        .ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelUp {
    pub level: u32,
}

pub fn level_threshold(level: u32) -> Option<u64> {
    LEVEL_THRESHOLDS.get(level as usize).copied()
}

fn fold_levels(profile: &mut Profile) -> Vec<LevelUp> {
    let mut level_ups = Vec::new();
    while profile.level < MAX_LEVEL {
        let Some(threshold) = level_threshold(profile.level) else {
            break;
        };
        if profile.xp < threshold {
            break;
        }
        profile.xp -= threshold;
        profile.level += 1;
        level_ups.push(LevelUp {
            level: profile.level,
        });
    }
    level_ups
}

/// Add XP, reporting one [`LevelUp`] per level crossed.
pub fn add_xp(profile: &Profile, amount: u64) -> (Profile, Vec<LevelUp>) {
    let mut next = profile.clone();
    next.xp = next.xp.saturating_add(amount);
    next.total_xp = next.total_xp.saturating_add(amount);
    let level_ups = fold_levels(&mut next);
    (next, level_ups)
}

/// Streak transition for a completion on `today`.
pub fn update_streak(profile: &Profile, today: NaiveDate) -> Profile {
    let mut next = profile.clone();
    match next.last_completed_date {
        Some(last) if last == today => {}
        Some(last) if Some(last) == today.pred_opt() => {
            next.streak = next.streak.saturating_add(1);
        }
        _ => next.streak = 1,
    }
    next.last_completed_date = Some(today);
    next.max_streak = next.max_streak.max(next.streak);
    next
}

/// Startup check: a streak whose last day is before yesterday is broken.
pub fn reconcile_streak(profile: &Profile, today: NaiveDate) -> Profile {
    let mut next = profile.clone();
    if let Some(last) = next.last_completed_date {
        if last != today && Some(last) != today.pred_opt() {
            next.streak = 0;
        }
    }
    next
}

pub fn update_daily_stats(profile: &Profile, today: NaiveDate) -> Profile {
    let mut next = profile.clone();
    if next.daily_date != Some(today) {
        next.daily_date = Some(today);
        next.daily_completed = 0;
    }
    next.daily_completed = next.daily_completed.saturating_add(1);
    next.max_daily_completed = next.max_daily_completed.max(next.daily_completed);
    next
}

pub fn today_completed(profile: &Profile, today: NaiveDate) -> u32 {
    if profile.daily_date == Some(today) {
        profile.daily_completed
    } else {
        0
    }
}

/// Sticky early-bird and night-owl flags for a completion at local `hour`.
pub fn apply_time_of_day(profile: &Profile, hour: u32) -> Profile {
    let mut next = profile.clone();
    if hour < EARLY_BIRD_BEFORE_HOUR {
        next.early_bird = true;
    }
    if hour < NIGHT_OWL_BEFORE_HOUR {
        next.night_owl = true;
    }
    next
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Achievement {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    #[serde(skip)]
    condition: fn(&Profile) -> bool,
}

impl Achievement {
    pub fn is_met(&self, profile: &Profile) -> bool {
        (self.condition)(profile)
    }
}

/// Evaluation order is the order unlocks are reported in.
pub static ACHIEVEMENTS: [Achievement; 12] = [
    Achievement {
        id: "first_todo",
        name: "First Step",
        description: "Complete your first task",
        icon: "🎉",
        condition: |p| p.total_completed >= 1,
    },
    Achievement {
        id: "ten_todos",
        name: "Good Start",
        description: "Complete 10 tasks",
        icon: "🌟",
        condition: |p| p.total_completed >= 10,
    },
    Achievement {
        id: "fifty_todos",
        name: "Steady Hands",
        description: "Complete 50 tasks",
        icon: "💪",
        condition: |p| p.total_completed >= 50,
    },
    Achievement {
        id: "hundred_todos",
        name: "Centurion",
        description: "Complete 100 tasks",
        icon: "🏆",
        condition: |p| p.total_completed >= 100,
    },
    Achievement {
        id: "streak_3",
        name: "Three in a Row",
        description: "Complete tasks 3 days in a row",
        icon: "🔥",
        condition: |p| p.max_streak >= 3,
    },
    Achievement {
        id: "streak_7",
        name: "Week Master",
        description: "Complete tasks 7 days in a row",
        icon: "⚡",
        condition: |p| p.max_streak >= 7,
    },
    Achievement {
        id: "streak_30",
        name: "Month Miracle",
        description: "Complete tasks 30 days in a row",
        icon: "👑",
        condition: |p| p.max_streak >= 30,
    },
    Achievement {
        id: "early_bird",
        name: "Early Bird",
        description: "Complete a task before 6 AM",
        icon: "🌅",
        condition: |p| p.early_bird,
    },
    Achievement {
        id: "night_owl",
        name: "Night Owl",
        description: "Complete a task after midnight",
        icon: "🦉",
        condition: |p| p.night_owl,
    },
    Achievement {
        id: "speed_demon",
        name: "Speed Demon",
        description: "Complete 10 tasks in one day",
        icon: "⚡",
        condition: |p| p.max_daily_completed >= 10,
    },
    Achievement {
        id: "level_5",
        name: "Rising Star",
        description: "Reach level 5",
        icon: "⭐",
        condition: |p| p.level >= 5,
    },
    Achievement {
        id: "level_10",
        name: "Veteran",
        description: "Reach level 10",
        icon: "🎖️",
        condition: |p| p.level >= 10,
    },
];

pub fn find_achievement(id: &str) -> Option<&'static Achievement> {
    ACHIEVEMENTS.iter().find(|achievement| achievement.id == id)
}

/// Unlock every achievement whose condition now holds.
pub fn check_achievements(profile: &Profile) -> (Profile, Vec<&'static Achievement>) {
    let mut next = profile.clone();
    let mut unlocked = Vec::new();
    for achievement in ACHIEVEMENTS.iter() {
        if next.has_achievement(achievement.id) {
            continue;
        }
        if achievement.is_met(&next) {
            next.achievements.push(achievement.id.to_string());
            unlocked.push(achievement);
        }
    }
    (next, unlocked)
}

/// Result of [`record_completion`].
#[derive(Debug, Clone)]
pub struct Completion {
    pub profile: Profile,
    pub xp_gained: u64,
    pub level_ups: Vec<LevelUp>,
    pub unlocked: Vec<&'static Achievement>,
}

/// Apply one task completion at local time `now`.
///
/// Order: streak, total count, daily stats, time-of-day flags, XP, then
/// achievements so level-based unlocks see the new level.
pub fn record_completion<Tz: TimeZone>(profile: &Profile, task: &Task, now: &DateTime<Tz>) -> Completion {
    let today = now.date_naive();
    let now_utc = now.with_timezone(&Utc);

    let mut next = update_streak(profile, today);
    next.total_completed = next.total_completed.saturating_add(1);
    let next = update_daily_stats(&next, today);
    let next = apply_time_of_day(&next, now.hour());

    let xp_gained = u64::from(age::xp_for_completion(task.created_at, now_utc));
    let (next, level_ups) = add_xp(&next, xp_gained);
    let (next, unlocked) = check_achievements(&next);

    Completion {
        profile: next,
        xp_gained,
        level_ups,
        unlocked,
    }
}
