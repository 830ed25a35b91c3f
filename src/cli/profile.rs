//! sticker profile and achievements commands.

use chrono::Local;
use serde::Serialize;

use crate::cli::{Context, GlobalOptions};
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::progression::{self, Profile, ACHIEVEMENTS};

#[derive(Serialize)]
struct ProfileOutput {
    #[serde(flatten)]
    profile: Profile,
    xp_to_next_level: Option<u64>,
    today_completed: u32,
}

#[derive(Serialize)]
struct AchievementView {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    icon: &'static str,
    unlocked: bool,
}

#[derive(Serialize)]
struct AchievementsOutput {
    unlocked: usize,
    total: usize,
    achievements: Vec<AchievementView>,
}

pub fn run_profile(global: GlobalOptions) -> Result<()> {
    let mut ctx = Context::open(&global)?;
    let profile = crate::storage::load_profile(&ctx.store)?;
    let today = Local::now().date_naive();

    let output = ProfileOutput {
        xp_to_next_level: profile.xp_to_next_level(),
        today_completed: progression::today_completed(&profile, today),
        profile,
    };

    let mut human = HumanOutput::new("Profile");
    human.push_summary("Level", output.profile.level.to_string());
    match output.xp_to_next_level {
        Some(remaining) => human.push_summary(
            "XP",
            format!("{} ({remaining} to next level)", output.profile.xp),
        ),
        None => human.push_summary("XP", format!("{} (max level)", output.profile.xp)),
    }
    human.push_summary("Total XP", output.profile.total_xp.to_string());
    human.push_summary(
        "Streak",
        format!(
            "{} day(s), best {}",
            output.profile.streak, output.profile.max_streak
        ),
    );
    human.push_summary("Completed", output.profile.total_completed.to_string());
    human.push_summary(
        "Today",
        format!(
            "{} (best day {})",
            output.today_completed, output.profile.max_daily_completed
        ),
    );
    human.push_summary(
        "Achievements",
        format!("{}/{}", output.profile.achievements.len(), ACHIEVEMENTS.len()),
    );
    for warning in ctx.take_warnings() {
        human.push_warning(warning);
    }

    emit_success(ctx.output(), "profile", &output, Some(&human))
}

pub fn run_achievements(global: GlobalOptions) -> Result<()> {
    let mut ctx = Context::open(&global)?;
    let profile = crate::storage::load_profile(&ctx.store)?;

    let achievements: Vec<AchievementView> = ACHIEVEMENTS
        .iter()
        .map(|achievement| AchievementView {
            id: achievement.id,
            name: achievement.name,
            description: achievement.description,
            icon: achievement.icon,
            unlocked: profile.has_achievement(achievement.id),
        })
        .collect();
    let unlocked = achievements.iter().filter(|view| view.unlocked).count();

    let mut human = HumanOutput::new("Achievements");
    human.push_summary("Unlocked", format!("{unlocked}/{}", achievements.len()));
    for view in &achievements {
        let mark = if view.unlocked { "[x]" } else { "[ ]" };
        human.push_detail(format!(
            "{mark} {} {} - {}",
            view.icon, view.name, view.description
        ));
    }
    for warning in ctx.take_warnings() {
        human.push_warning(warning);
    }

    let output = AchievementsOutput {
        unlocked,
        total: achievements.len(),
        achievements,
    };
    emit_success(ctx.output(), "achievements", &output, Some(&human))
}
