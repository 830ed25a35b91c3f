//! sticker task command implementations.

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::age::{self, Badge};
use crate::cli::{Context, GlobalOptions};
use crate::error::{Error, Result};
use crate::events::EventKind;
use crate::output::{emit_success, HumanOutput};
use crate::progression::{self, Completion};
use crate::storage;
use crate::task::{self, Direction, StatusFilter, Task};

const MIN_PREFIX_LEN: usize = 4;

pub struct AddOptions {
    pub text: String,
    pub emoji: Option<String>,
    pub global: GlobalOptions,
}

pub struct ListOptions {
    pub filter: String,
    pub search: Option<String>,
    pub global: GlobalOptions,
}

pub struct TargetOptions {
    pub task: String,
    pub global: GlobalOptions,
}

pub struct MoveOptions {
    pub task: String,
    pub direction: Option<String>,
    pub to: Option<String>,
    pub end: bool,
    pub global: GlobalOptions,
}

pub struct EditOptions {
    pub task: String,
    pub text: String,
    pub global: GlobalOptions,
}

pub struct PostponeOptions {
    pub task: String,
    pub until: Option<String>,
    pub global: GlobalOptions,
}

#[derive(Serialize)]
struct TaskView {
    position: usize,
    #[serde(flatten)]
    task: Task,
    badge: Badge,
}

#[derive(Serialize)]
struct TaskListOutput {
    total: usize,
    active: usize,
    completed: usize,
    tasks: Vec<TaskView>,
}

#[derive(Serialize)]
struct TaskOutput {
    task: Task,
}

#[derive(Serialize)]
struct DoneOutput {
    task: Task,
    #[serde(skip_serializing_if = "Option::is_none")]
    xp_gained: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    level: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    level_ups: Vec<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    unlocked: Vec<&'static str>,
}

#[derive(Serialize)]
struct ClearOutput {
    removed: usize,
    remaining: usize,
}

#[derive(Serialize)]
struct PickOutput {
    task: Option<Task>,
}

/// Resolve a user-supplied reference to a task id.
///
/// Accepts an exact id, a 1-based position in the pinned-first listing, or
/// an unambiguous id prefix of at least four characters.
pub(crate) fn resolve_task(list: &[Task], reference: &str) -> Result<String> {
    let reference = reference.trim();
    if let Some(task) = task::find(list, reference) {
        return Ok(task.id.clone());
    }

    // Out-of-range positions fall through: ids may start with digits.
    if let Ok(position) = reference.parse::<usize>() {
        let ordered = task::stable_partition_pinned(list);
        if let Some(task) = position.checked_sub(1).and_then(|idx| ordered.get(idx)) {
            return Ok(task.id.clone());
        }
    }

    if reference.chars().count() >= MIN_PREFIX_LEN {
        let matches: Vec<&Task> = list
            .iter()
            .filter(|task| task.id.starts_with(reference))
            .collect();
        match matches.as_slice() {
            [task] => return Ok(task.id.clone()),
            [] => {}
            _ => {
                return Err(Error::InvalidArgument(format!(
                    "task prefix '{reference}' matches {} tasks",
                    matches.len()
                )))
            }
        }
    }

    Err(Error::TaskNotFound(reference.to_string()))
}

fn load(ctx: &Context) -> Result<Vec<Task>> {
    storage::load_tasks(&ctx.store, Utc::now())
}

fn lookup(list: &[Task], id: &str) -> Result<Task> {
    task::find(list, id)
        .cloned()
        .ok_or_else(|| Error::TaskNotFound(id.to_string()))
}

fn label(task: &Task) -> String {
    match &task.emoji {
        Some(emoji) => format!("{emoji} {}", task.text),
        None => task.text.clone(),
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn finish<T: Serialize>(ctx: &mut Context, command: &str, data: &T, mut human: HumanOutput) -> Result<()> {
    for warning in ctx.take_warnings() {
        human.push_warning(warning);
    }
    emit_success(ctx.output(), command, data, Some(&human))
}

pub fn run_add(options: AddOptions) -> Result<()> {
    let mut ctx = Context::open(&options.global)?;
    let text = task::validate_text(&options.text)?;
    let list = load(&ctx)?;

    let next = task::add(
        &list,
        &text,
        task::AddOptions {
            emoji: options.emoji.filter(|emoji| !emoji.trim().is_empty()),
            now: Utc::now(),
        },
    );
    storage::save_tasks(&ctx.store, &next)?;
    let added = next
        .first()
        .cloned()
        .ok_or_else(|| Error::OperationFailed("task was not added".to_string()))?;
    tracing::info!(id = %added.id, "task added");
    ctx.emit(EventKind::TaskAdded, &added);

    let mut human = HumanOutput::new("Task added");
    human.push_summary("ID", short_id(&added.id));
    human.push_summary("Text", label(&added));
    human.push_summary("Active", task::count_active(&next).to_string());
    finish(&mut ctx, "add", &TaskOutput { task: added }, human)
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let mut ctx = Context::open(&options.global)?;
    let mode: StatusFilter = options.filter.parse()?;
    let list = load(&ctx)?;
    let now = Utc::now();

    let ordered = task::stable_partition_pinned(&list);
    let query = options.search.as_deref().unwrap_or("");
    let visible = task::search_filtered(&ordered, mode, query);

    let tasks: Vec<TaskView> = visible
        .into_iter()
        .map(|task| {
            let position = ordered
                .iter()
                .position(|candidate| candidate.id == task.id)
                .map(|idx| idx + 1)
                .unwrap_or(0);
            let badge = age::badge(&task, now);
            TaskView {
                position,
                task,
                badge,
            }
        })
        .collect();

    let output = TaskListOutput {
        total: tasks.len(),
        active: task::count_active(&list),
        completed: task::count_completed(&list),
        tasks,
    };

    let mut human = HumanOutput::new("Tasks");
    human.push_summary("Active", output.active.to_string());
    human.push_summary("Completed", output.completed.to_string());
    if !query.trim().is_empty() {
        human.push_summary("Search", query.trim());
    }
    for view in &output.tasks {
        let check = if view.task.completed { "[x]" } else { "[ ]" };
        let pin = if view.task.pinned { " (pinned)" } else { "" };
        let badge = match &view.badge {
            Badge::Postponed { until } => format!(
                "postponed until {}",
                until.with_timezone(&Local).format("%Y-%m-%d %H:%M")
            ),
            Badge::Age(bucket) => bucket.text.clone(),
        };
        human.push_detail(format!(
            "{:>2}. {check} {}{pin} ({badge}) {}",
            view.position,
            label(&view.task),
            short_id(&view.task.id)
        ));
    }
    if list.is_empty() {
        human.push_next_step("sticker add \"...\"");
    }
    finish(&mut ctx, "list", &output, human)
}

pub fn run_done(options: TargetOptions) -> Result<()> {
    let mut ctx = Context::open(&options.global)?;
    let list = load(&ctx)?;
    let id = resolve_task(&list, &options.task)?;

    let next = task::toggle_completed(&list, &id);
    let toggled = lookup(&next, &id)?;

    if !toggled.completed {
        storage::save_tasks(&ctx.store, &next)?;
        ctx.emit(EventKind::TaskReopened, &toggled);
        let mut human = HumanOutput::new("Task reopened");
        human.push_summary("Text", label(&toggled));
        let output = DoneOutput {
            task: toggled,
            xp_gained: None,
            level: None,
            level_ups: Vec::new(),
            unlocked: Vec::new(),
        };
        return finish(&mut ctx, "done", &output, human);
    }

    let previous = storage::load_profile(&ctx.store)?;
    let Completion {
        profile,
        xp_gained,
        level_ups,
        unlocked,
    } = progression::record_completion(&previous, &toggled, &Local::now());
    storage::save_completion(&ctx.store, &next, &profile, &previous)?;
    tracing::info!(id = %toggled.id, xp_gained, level = profile.level, "task completed");

    ctx.emit(EventKind::TaskCompleted, &toggled);
    ctx.emit(
        EventKind::XpGained,
        &serde_json::json!({ "xp": xp_gained, "total_xp": profile.total_xp }),
    );
    for level_up in &level_ups {
        ctx.emit(EventKind::LevelUp, level_up);
    }
    for achievement in &unlocked {
        ctx.emit(EventKind::AchievementUnlocked, achievement);
    }

    let mut human = HumanOutput::new("Task completed");
    human.push_summary("Text", label(&toggled));
    human.push_summary("XP", format!("+{xp_gained}"));
    human.push_summary("Level", profile.level.to_string());
    human.push_summary("Streak", format!("{} day(s)", profile.streak));
    for level_up in &level_ups {
        human.push_detail(format!("Level up! Now level {}", level_up.level));
    }
    for achievement in &unlocked {
        human.push_detail(format!(
            "Achievement unlocked: {} {} ({})",
            achievement.icon, achievement.name, achievement.description
        ));
    }

    let output = DoneOutput {
        task: toggled,
        xp_gained: Some(xp_gained),
        level: Some(profile.level),
        level_ups: level_ups.iter().map(|level_up| level_up.level).collect(),
        unlocked: unlocked.iter().map(|achievement| achievement.id).collect(),
    };
    finish(&mut ctx, "done", &output, human)
}

pub fn run_rm(options: TargetOptions) -> Result<()> {
    let mut ctx = Context::open(&options.global)?;
    let list = load(&ctx)?;
    let id = resolve_task(&list, &options.task)?;
    let removed = lookup(&list, &id)?;

    let next = task::delete(&list, &id);
    storage::save_tasks(&ctx.store, &next)?;
    ctx.emit(EventKind::TaskDeleted, &removed);

    let mut human = HumanOutput::new("Task deleted");
    human.push_summary("Text", label(&removed));
    finish(&mut ctx, "rm", &TaskOutput { task: removed }, human)
}

pub fn run_mv(options: MoveOptions) -> Result<()> {
    let mut ctx = Context::open(&options.global)?;
    let list = load(&ctx)?;
    let id = resolve_task(&list, &options.task)?;

    let next = match (options.direction.as_deref(), options.to.as_deref(), options.end) {
        (Some(direction), None, false) => {
            let direction: Direction = direction.parse()?;
            task::move_by(&list, &id, direction)
        }
        (None, Some(target), false) => {
            let target_id = resolve_task(&list, target)?;
            task::move_to(&list, &id, &target_id)
        }
        (None, None, true) => task::move_to_end(&list, &id),
        _ => {
            return Err(Error::InvalidArgument(
                "give one of: up, down, --to <task>, --end".to_string(),
            ))
        }
    };
    storage::save_tasks(&ctx.store, &next)?;

    let moved = lookup(&next, &id)?;
    let position = next
        .iter()
        .position(|task| task.id == id)
        .map(|idx| idx + 1)
        .unwrap_or(0);
    ctx.emit(
        EventKind::TaskMoved,
        &serde_json::json!({ "id": moved.id, "position": position }),
    );

    let mut human = HumanOutput::new("Task moved");
    human.push_summary("Text", label(&moved));
    human.push_summary("Position", position.to_string());
    finish(&mut ctx, "mv", &TaskOutput { task: moved }, human)
}

pub fn run_edit(options: EditOptions) -> Result<()> {
    let mut ctx = Context::open(&options.global)?;
    let text = task::validate_text(&options.text)?;
    let list = load(&ctx)?;
    let id = resolve_task(&list, &options.task)?;

    let next = task::rename_text(&list, &id, &text);
    storage::save_tasks(&ctx.store, &next)?;
    let edited = lookup(&next, &id)?;
    ctx.emit(EventKind::TaskEdited, &edited);

    let mut human = HumanOutput::new("Task edited");
    human.push_summary("Text", label(&edited));
    finish(&mut ctx, "edit", &TaskOutput { task: edited }, human)
}

pub fn run_pin(options: TargetOptions) -> Result<()> {
    let mut ctx = Context::open(&options.global)?;
    let list = load(&ctx)?;
    let id = resolve_task(&list, &options.task)?;

    let next = task::toggle_pinned(&list, &id);
    storage::save_tasks(&ctx.store, &next)?;
    let pinned = lookup(&next, &id)?;
    let (kind, header) = if pinned.pinned {
        (EventKind::TaskPinned, "Task pinned")
    } else {
        (EventKind::TaskUnpinned, "Task unpinned")
    };
    ctx.emit(kind, &pinned);

    let mut human = HumanOutput::new(header);
    human.push_summary("Text", label(&pinned));
    finish(&mut ctx, "pin", &TaskOutput { task: pinned }, human)
}

/// Local midnight at the start of the next day.
fn next_local_midnight(now: DateTime<Local>) -> DateTime<Utc> {
    let tomorrow = now.date_naive() + Duration::days(1);
    tomorrow
        .and_hms_opt(0, 0, 0)
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| now.with_timezone(&Utc) + Duration::days(1))
}

pub fn run_postpone(options: PostponeOptions) -> Result<()> {
    let mut ctx = Context::open(&options.global)?;
    let until = match options.until.as_deref() {
        Some(raw) => DateTime::parse_from_rfc3339(raw.trim())
            .map(|stamp| stamp.with_timezone(&Utc))
            .map_err(|err| Error::InvalidArgument(format!("invalid --until '{raw}': {err}")))?,
        None => next_local_midnight(Local::now()),
    };
    let list = load(&ctx)?;
    let id = resolve_task(&list, &options.task)?;

    let next = task::postpone_until(&list, &id, until);
    storage::save_tasks(&ctx.store, &next)?;
    let postponed = lookup(&next, &id)?;
    ctx.emit(EventKind::TaskPostponed, &postponed);

    let mut human = HumanOutput::new("Task postponed");
    human.push_summary("Text", label(&postponed));
    human.push_summary(
        "Until",
        until.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
    );
    finish(&mut ctx, "postpone", &TaskOutput { task: postponed }, human)
}

pub fn run_clear(global: GlobalOptions) -> Result<()> {
    let mut ctx = Context::open(&global)?;
    let list = load(&ctx)?;
    let next = task::clear_completed(&list);
    let output = ClearOutput {
        removed: list.len() - next.len(),
        remaining: next.len(),
    };
    if output.removed > 0 {
        storage::save_tasks(&ctx.store, &next)?;
        ctx.emit(EventKind::CompletedCleared, &output);
    }

    let mut human = HumanOutput::new("Completed tasks cleared");
    human.push_summary("Removed", output.removed.to_string());
    human.push_summary("Remaining", output.remaining.to_string());
    finish(&mut ctx, "clear", &output, human)
}

pub fn run_pick(global: GlobalOptions) -> Result<()> {
    let mut ctx = Context::open(&global)?;
    let list = load(&ctx)?;
    let roll = Uuid::new_v4().as_u128() as u64;
    let picked = task::pick_active(&list, roll).cloned();

    let mut human = match &picked {
        Some(task) => {
            let mut human = HumanOutput::new("Picked");
            human.push_summary("Text", label(task));
            human.push_summary("ID", short_id(&task.id));
            human
        }
        None => {
            let mut human = HumanOutput::new("Nothing to pick");
            human.push_next_step("sticker add \"...\"");
            human
        }
    };
    if picked.is_some() {
        human.push_next_step("sticker focus on");
    }
    finish(&mut ctx, "pick", &PickOutput { task: picked }, human)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Vec<Task> {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap();
        let mut list = Vec::new();
        for text in ["c", "b", "a"] {
            list = task::add(&list, text, task::AddOptions { emoji: None, now });
        }
        list
    }

    #[test]
    fn resolves_by_id_position_and_prefix() {
        let list = sample();
        let pinned = task::toggle_pinned(&list, &list[2].id);

        assert_eq!(resolve_task(&list, &list[1].id).unwrap(), list[1].id);
        assert_eq!(resolve_task(&pinned, "1").unwrap(), list[2].id);
        assert_eq!(resolve_task(&pinned, "2").unwrap(), list[0].id);
        assert_eq!(resolve_task(&list, &list[0].id[..8]).unwrap(), list[0].id);

        assert!(matches!(resolve_task(&list, "0"), Err(Error::TaskNotFound(_))));
        assert!(matches!(resolve_task(&list, "9"), Err(Error::TaskNotFound(_))));
        assert!(matches!(resolve_task(&list, "abc"), Err(Error::TaskNotFound(_))));
    }

    #[test]
    fn numeric_reference_falls_back_to_prefix() {
        let mut list = sample();
        list[1].id = "12345678-aaaa".to_string();

        assert_eq!(resolve_task(&list, "1234").unwrap(), "12345678-aaaa");
        assert_eq!(resolve_task(&list, "2").unwrap(), "12345678-aaaa");
        assert!(matches!(resolve_task(&list, "9999"), Err(Error::TaskNotFound(_))));
    }

    #[test]
    fn ambiguous_prefix_is_rejected() {
        let mut list = sample();
        list[0].id = "abcd-1".to_string();
        list[1].id = "abcd-2".to_string();
        assert!(matches!(resolve_task(&list, "abcd"), Err(Error::InvalidArgument(_))));
        assert_eq!(resolve_task(&list, "abcd-2").unwrap(), "abcd-2");
    }

    #[test]
    fn midnight_is_in_the_future() {
        let now = Local::now();
        let midnight = next_local_midnight(now);
        assert!(midnight > now.with_timezone(&Utc));
        assert!(midnight - now.with_timezone(&Utc) <= Duration::hours(25));
    }
}
