//! Focus sessions.
//!
//! A session is plain state advanced by the caller with an explicit `now`;
//! nothing here reads a clock or runs a timer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const IDLE_AFTER_MINUTES: i64 = 10;
const SLEEPING_AFTER_MINUTES: i64 = 30;

/// Tier labels by minutes focused; the last entry at or below the elapsed
/// time applies.
pub const FOCUS_TIERS: [FocusTier; 8] = [
    FocusTier { min_minutes: 0, emoji: "🔥", text: "Focus started!" },
    FocusTier { min_minutes: 5, emoji: "💪", text: "Warming up" },
    FocusTier { min_minutes: 15, emoji: "🚀", text: "In the zone" },
    FocusTier { min_minutes: 30, emoji: "⚡", text: "Deep focus" },
    FocusTier { min_minutes: 45, emoji: "🌟", text: "Focus master" },
    FocusTier { min_minutes: 60, emoji: "👑", text: "Past one hour!" },
    FocusTier { min_minutes: 90, emoji: "🏆", text: "Impressive!" },
    FocusTier { min_minutes: 120, emoji: "🦸", text: "Focus hero!" },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FocusTier {
    pub min_minutes: i64,
    pub emoji: &'static str,
    pub text: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    Active,
    Idle,
    Sleeping,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusSession {
    pub started_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl FocusSession {
    pub fn start(now: DateTime<Utc>) -> Self {
        Self {
            started_at: now,
            last_activity_at: now,
        }
    }

    pub fn record_activity(&self, now: DateTime<Utc>) -> Self {
        Self {
            started_at: self.started_at,
            last_activity_at: now.max(self.last_activity_at),
        }
    }

    pub fn elapsed_minutes(&self, now: DateTime<Utc>) -> i64 {
        (now - self.started_at).num_minutes().max(0)
    }

    pub fn tier(&self, now: DateTime<Utc>) -> FocusTier {
        let minutes = self.elapsed_minutes(now);
        FOCUS_TIERS
            .iter()
            .rev()
            .find(|tier| minutes >= tier.min_minutes)
            .copied()
            .unwrap_or(FOCUS_TIERS[0])
    }

    pub fn activity(&self, now: DateTime<Utc>) -> Activity {
        let idle = (now - self.last_activity_at).num_minutes();
        if idle < IDLE_AFTER_MINUTES {
            Activity::Active
        } else if idle < SLEEPING_AFTER_MINUTES {
            Activity::Idle
        } else {
            Activity::Sleeping
        }
    }
}

/// `45m`, `1h`, `1h 30m`.
pub fn format_elapsed(minutes: i64) -> String {
    let minutes = minutes.max(0);
    if minutes < 60 {
        return format!("{minutes}m");
    }
    let (hours, rest) = (minutes / 60, minutes % 60);
    if rest == 0 {
        format!("{hours}h")
    } else {
        format!("{hours}h {rest}m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap()
    }

    #[test]
    fn tiers_follow_elapsed_minutes() {
        let session = FocusSession::start(t0());
        assert_eq!(session.tier(t0()).min_minutes, 0);
        assert_eq!(session.tier(t0() + Duration::minutes(16)).min_minutes, 15);
        assert_eq!(session.tier(t0() + Duration::minutes(61)).text, "Past one hour!");
        assert_eq!(session.tier(t0() + Duration::hours(5)).min_minutes, 120);
        assert_eq!(session.tier(t0() - Duration::minutes(5)).min_minutes, 0);
    }

    #[test]
    fn activity_decays_without_input() {
        let session = FocusSession::start(t0());
        assert_eq!(session.activity(t0() + Duration::minutes(9)), Activity::Active);
        assert_eq!(session.activity(t0() + Duration::minutes(10)), Activity::Idle);
        assert_eq!(session.activity(t0() + Duration::minutes(45)), Activity::Sleeping);

        let touched = session.record_activity(t0() + Duration::minutes(40));
        assert_eq!(touched.activity(t0() + Duration::minutes(45)), Activity::Active);
        assert_eq!(touched.started_at, t0());
    }

    #[test]
    fn elapsed_formatting() {
        assert_eq!(format_elapsed(0), "0m");
        assert_eq!(format_elapsed(45), "45m");
        assert_eq!(format_elapsed(60), "1h");
        assert_eq!(format_elapsed(90), "1h 30m");
    }
}
