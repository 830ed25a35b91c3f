//! sticker focus commands.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::{Context, GlobalOptions};
use crate::error::Result;
use crate::events::EventKind;
use crate::focus::{format_elapsed, Activity, FocusSession};
use crate::output::{emit_success, HumanOutput};
use crate::storage;

#[derive(Serialize)]
struct FocusOutput {
    active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    elapsed_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    activity: Option<Activity>,
}

impl FocusOutput {
    fn inactive() -> Self {
        Self {
            active: false,
            started_at: None,
            elapsed_minutes: None,
            tier: None,
            activity: None,
        }
    }

    fn describe(session: &FocusSession, now: DateTime<Utc>, active: bool) -> Self {
        let tier = session.tier(now);
        Self {
            active,
            started_at: Some(session.started_at),
            elapsed_minutes: Some(session.elapsed_minutes(now)),
            tier: Some(format!("{} {}", tier.emoji, tier.text)),
            activity: Some(session.activity(now)),
        }
    }

    fn push_human(&self, human: &mut HumanOutput) {
        if let Some(minutes) = self.elapsed_minutes {
            human.push_summary("Elapsed", format_elapsed(minutes));
        }
        if let Some(tier) = &self.tier {
            human.push_summary("Tier", tier.clone());
        }
        if let Some(activity) = self.activity {
            let label = match activity {
                Activity::Active => "active",
                Activity::Idle => "idle",
                Activity::Sleeping => "sleeping",
            };
            human.push_summary("Activity", label);
        }
    }
}

pub fn run_on(global: GlobalOptions) -> Result<()> {
    let mut ctx = Context::open(&global)?;
    let now = Utc::now();

    let (session, header) = match storage::load_focus_session(&ctx.store)? {
        Some(existing) => (existing.record_activity(now), "Focus session continued"),
        None => {
            let session = FocusSession::start(now);
            ctx.emit(EventKind::FocusStarted, &session);
            (session, "Focus session started")
        }
    };
    storage::save_focus_session(&ctx.store, &session)?;

    let output = FocusOutput::describe(&session, now, true);
    let mut human = HumanOutput::new(header);
    output.push_human(&mut human);
    human.push_next_step("sticker focus off");
    for warning in ctx.take_warnings() {
        human.push_warning(warning);
    }
    emit_success(ctx.output(), "focus on", &output, Some(&human))
}

pub fn run_off(global: GlobalOptions) -> Result<()> {
    let mut ctx = Context::open(&global)?;
    let now = Utc::now();

    let Some(session) = storage::load_focus_session(&ctx.store)? else {
        let mut human = HumanOutput::new("No focus session running");
        human.push_next_step("sticker focus on");
        return emit_success(ctx.output(), "focus off", &FocusOutput::inactive(), Some(&human));
    };
    storage::clear_focus_session(&ctx.store)?;

    let output = FocusOutput::describe(&session, now, false);
    ctx.emit(EventKind::FocusEnded, &output);
    tracing::info!(minutes = session.elapsed_minutes(now), "focus session ended");

    let mut human = HumanOutput::new("Focus session ended");
    output.push_human(&mut human);
    for warning in ctx.take_warnings() {
        human.push_warning(warning);
    }
    emit_success(ctx.output(), "focus off", &output, Some(&human))
}

pub fn run_status(global: GlobalOptions) -> Result<()> {
    let mut ctx = Context::open(&global)?;
    let now = Utc::now();

    let (output, mut human) = match storage::load_focus_session(&ctx.store)? {
        Some(session) => {
            let output = FocusOutput::describe(&session, now, true);
            let mut human = HumanOutput::new("Focus session");
            output.push_human(&mut human);
            (output, human)
        }
        None => {
            let mut human = HumanOutput::new("No focus session running");
            human.push_next_step("sticker focus on");
            (FocusOutput::inactive(), human)
        }
    };
    for warning in ctx.take_warnings() {
        human.push_warning(warning);
    }
    emit_success(ctx.output(), "focus status", &output, Some(&human))
}
