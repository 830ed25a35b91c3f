//! Task list transforms.
//!
//! Every operation takes the current list by reference and returns a new
//! `Vec<Task>`. Nothing here mutates its input or fails: an unknown id or
//! rejected text yields an unchanged copy of the list.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Maximum task text length, counted in characters after trimming.
pub const TEXT_MAX_LEN: usize = 200;
/// Minimum task text length after trimming.
pub const TEXT_MIN_LEN: usize = 1;
/// Text used when a stored record has none.
pub const PLACEHOLDER_TEXT: &str = "(no text)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postponed_until: Option<DateTime<Utc>>,
}

impl Task {
    fn new(text: String, emoji: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: new_task_id(),
            text,
            completed: false,
            created_at: now,
            pinned: false,
            emoji,
            postponed_until: None,
        }
    }
}

/// Options accepted by [`add`].
#[derive(Debug, Clone)]
pub struct AddOptions {
    pub emoji: Option<String>,
    pub now: DateTime<Utc>,
}

impl Default for AddOptions {
    fn default() -> Self {
        Self {
            emoji: None,
            now: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

impl std::str::FromStr for Direction {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            other => Err(Error::InvalidArgument(format!(
                "unknown direction '{other}' (expected up|down)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl StatusFilter {
    fn matches(self, task: &Task) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => !task.completed,
            StatusFilter::Completed => task.completed,
        }
    }
}

impl std::str::FromStr for StatusFilter {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "active" => Ok(StatusFilter::Active),
            "completed" => Ok(StatusFilter::Completed),
            other => Err(Error::InvalidArgument(format!(
                "unknown filter '{other}' (expected all|active|completed)"
            ))),
        }
    }
}

pub fn new_task_id() -> String {
    Uuid::new_v4().to_string()
}

/// Validate and normalize task text.
///
/// Shared by [`add`] and [`rename_text`]: the text is trimmed, must hold
/// between 1 and 200 characters, and runs of line breaks become one space.
pub fn validate_text(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let len = trimmed.chars().count();
    if len < TEXT_MIN_LEN {
        return Err(Error::InvalidArgument("task text cannot be empty".to_string()));
    }
    if len > TEXT_MAX_LEN {
        return Err(Error::InvalidArgument(format!(
            "task text is {len} characters (max {TEXT_MAX_LEN})"
        )));
    }
    Ok(collapse_line_breaks(trimmed))
}

fn collapse_line_breaks(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_break = false;
    for ch in text.chars() {
        if ch == '\r' || ch == '\n' {
            if !in_break {
                out.push(' ');
                in_break = true;
            }
        } else {
            out.push(ch);
            in_break = false;
        }
    }
    out
}

pub fn add(list: &[Task], text: &str, options: AddOptions) -> Vec<Task> {
    let Ok(text) = validate_text(text) else {
        return list.to_vec();
    };
    let mut next = Vec::with_capacity(list.len() + 1);
    next.push(Task::new(text, options.emoji, options.now));
    next.extend_from_slice(list);
    next
}

pub fn find<'a>(list: &'a [Task], id: &str) -> Option<&'a Task> {
    list.iter().find(|task| task.id == id)
}

fn position(list: &[Task], id: &str) -> Option<usize> {
    list.iter().position(|task| task.id == id)
}

fn update_by_id<F>(list: &[Task], id: &str, update: F) -> Vec<Task>
where
    F: Fn(&mut Task),
{
    list.iter()
        .cloned()
        .map(|mut task| {
            if task.id == id {
                update(&mut task);
            }
            task
        })
        .collect()
}

pub fn toggle_completed(list: &[Task], id: &str) -> Vec<Task> {
    update_by_id(list, id, |task| task.completed = !task.completed)
}

pub fn delete(list: &[Task], id: &str) -> Vec<Task> {
    list.iter().filter(|task| task.id != id).cloned().collect()
}

/// Swap the task with its neighbour in `direction`.
pub fn move_by(list: &[Task], id: &str, direction: Direction) -> Vec<Task> {
    let mut next = list.to_vec();
    let Some(idx) = position(list, id) else {
        return next;
    };
    let target = match direction {
        Direction::Up => idx.checked_sub(1),
        Direction::Down => Some(idx + 1).filter(|&target| target < list.len()),
    };
    if let Some(target) = target {
        next.swap(idx, target);
    }
    next
}

/// Drag-and-drop reorder: the task lands at the target's current index.
pub fn move_to(list: &[Task], id: &str, target_id: &str) -> Vec<Task> {
    let mut next = list.to_vec();
    let (Some(from), Some(to)) = (position(list, id), position(list, target_id)) else {
        return next;
    };
    if from == to {
        return next;
    }
    let task = next.remove(from);
    next.insert(to, task);
    next
}

/// Drop onto the empty area below the list.
pub fn move_to_end(list: &[Task], id: &str) -> Vec<Task> {
    let mut next = list.to_vec();
    if let Some(from) = position(list, id) {
        let task = next.remove(from);
        next.push(task);
    }
    next
}

pub fn rename_text(list: &[Task], id: &str, new_text: &str) -> Vec<Task> {
    let Ok(text) = validate_text(new_text) else {
        return list.to_vec();
    };
    update_by_id(list, id, |task| task.text = text.clone())
}

pub fn toggle_pinned(list: &[Task], id: &str) -> Vec<Task> {
    update_by_id(list, id, |task| task.pinned = !task.pinned)
}

pub fn postpone_until(list: &[Task], id: &str, until: DateTime<Utc>) -> Vec<Task> {
    update_by_id(list, id, |task| task.postponed_until = Some(until))
}

pub fn clear_completed(list: &[Task]) -> Vec<Task> {
    list.iter().filter(|task| !task.completed).cloned().collect()
}

/// Pinned tasks first, relative order kept inside both groups.
pub fn stable_partition_pinned(list: &[Task]) -> Vec<Task> {
    let (pinned, unpinned): (Vec<Task>, Vec<Task>) =
        list.iter().cloned().partition(|task| task.pinned);
    pinned.into_iter().chain(unpinned).collect()
}

pub fn count_active(list: &[Task]) -> usize {
    list.iter().filter(|task| !task.completed).count()
}

pub fn count_completed(list: &[Task]) -> usize {
    list.iter().filter(|task| task.completed).count()
}

pub fn search(list: &[Task], query: &str) -> Vec<Task> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return list.to_vec();
    }
    list.iter()
        .filter(|task| task.text.to_lowercase().contains(&query))
        .cloned()
        .collect()
}

pub fn filter_by_status(list: &[Task], mode: StatusFilter) -> Vec<Task> {
    list.iter().filter(|task| mode.matches(task)).cloned().collect()
}

/// Status filter followed by text search, the order the list view applies them.
pub fn search_filtered(list: &[Task], mode: StatusFilter, query: &str) -> Vec<Task> {
    search(&filter_by_status(list, mode), query)
}

/// Roulette pick among active tasks; `roll` is caller-supplied entropy.
pub fn pick_active(list: &[Task], roll: u64) -> Option<&Task> {
    let active: Vec<&Task> = list.iter().filter(|task| !task.completed).collect();
    if active.is_empty() {
        return None;
    }
    let idx = (roll % active.len() as u64) as usize;
    Some(active[idx])
}

/// Loosely-typed task record as found in storage or backup files.
///
/// Every field is kept as raw JSON so one badly typed value cannot make the
/// whole record unreadable; [`repair`] coerces them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTask {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub text: Option<Value>,
    #[serde(default)]
    pub completed: Option<Value>,
    #[serde(default)]
    pub created_at: Option<Value>,
    #[serde(default)]
    pub pinned: Option<Value>,
    #[serde(default)]
    pub emoji: Option<Value>,
    #[serde(default)]
    pub postponed_until: Option<Value>,
}

impl StoredTask {
    /// Decode one raw list entry. Only non-objects are rejected.
    pub fn from_entry(entry: Value) -> Option<Self> {
        if !entry.is_object() {
            return None;
        }
        serde_json::from_value(entry).ok()
    }
}

/// JavaScript truthiness: `false`, `0`, `""` and `null` are false.
fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().map(|n| n != 0.0).unwrap_or(false),
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// RFC 3339 string or epoch milliseconds.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(raw) => DateTime::parse_from_rfc3339(raw.trim())
            .ok()
            .map(|stamp| stamp.with_timezone(&Utc)),
        Value::Number(number) => number
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    }
}

/// Turn stored records into valid tasks, reporting every fix applied.
///
/// Ids may have been numbers in older data; they are kept as strings.
/// Blank or duplicate ids get a fresh id so the list invariant holds.
pub fn repair(stored: Vec<StoredTask>, now: DateTime<Utc>) -> (Vec<Task>, Vec<String>) {
    let mut issues = Vec::new();
    let mut seen = HashSet::new();
    let mut tasks = Vec::with_capacity(stored.len());

    for (index, record) in stored.into_iter().enumerate() {
        let mut id = match record.id {
            Some(Value::String(value)) => value.trim().to_string(),
            Some(Value::Number(value)) => value.to_string(),
            _ => String::new(),
        };
        if id.is_empty() {
            id = new_task_id();
            issues.push(format!("task #{index}: missing id, assigned {id}"));
        } else if seen.contains(&id) {
            let fresh = new_task_id();
            issues.push(format!("task #{index}: duplicate id {id}, assigned {fresh}"));
            id = fresh;
        }
        seen.insert(id.clone());

        let raw_text = match record.text {
            Some(Value::String(value)) => value,
            _ => String::new(),
        };
        let text = match validate_text(&raw_text) {
            Ok(text) => text,
            Err(_) if raw_text.trim().is_empty() => {
                issues.push(format!("task {id}: missing text"));
                PLACEHOLDER_TEXT.to_string()
            }
            Err(_) => {
                issues.push(format!("task {id}: text truncated to {TEXT_MAX_LEN} characters"));
                let truncated: String = raw_text.trim().chars().take(TEXT_MAX_LEN).collect();
                collapse_line_breaks(truncated.trim_end())
            }
        };

        let created_at = match record.created_at.as_ref() {
            None | Some(Value::Null) => {
                issues.push(format!("task {id}: missing createdAt"));
                now
            }
            Some(raw) => parse_timestamp(raw).unwrap_or_else(|| {
                issues.push(format!("task {id}: unreadable createdAt {raw}, using now"));
                now
            }),
        };

        let postponed_until = match record.postponed_until.as_ref() {
            None | Some(Value::Null) => None,
            Some(raw) => {
                let parsed = parse_timestamp(raw);
                if parsed.is_none() {
                    issues.push(format!("task {id}: unreadable postponedUntil {raw}, cleared"));
                }
                parsed
            }
        };

        let emoji = match record.emoji {
            Some(Value::String(emoji)) if !emoji.trim().is_empty() => Some(emoji),
            _ => None,
        };

        for (field, raw) in [("completed", &record.completed), ("pinned", &record.pinned)] {
            if let Some(raw) = raw.as_ref().filter(|raw| !raw.is_boolean() && !raw.is_null()) {
                issues.push(format!("task {id}: {field} was {raw}, coerced"));
            }
        }

        tasks.push(Task {
            id,
            text,
            completed: truthy(record.completed.as_ref()),
            created_at,
            pinned: truthy(record.pinned.as_ref()),
            emoji,
            postponed_until,
        });
    }

    (tasks, issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, hour, 0, 0).unwrap()
    }

    fn opts() -> AddOptions {
        AddOptions {
            emoji: None,
            now: at(9),
        }
    }

    fn sample() -> Vec<Task> {
        let list = add(&[], "Task 1", opts());
        add(&list, "Task 2", AddOptions { emoji: Some("🎯".to_string()), now: at(10) })
    }

    #[test]
    fn add_prepends_trimmed_task() {
        let list = sample();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].text, "Task 2");
        assert_eq!(list[0].emoji.as_deref(), Some("🎯"));
        assert!(!list[0].completed);
        assert!(!list[0].pinned);
        assert_eq!(list[1].created_at, at(9));

        let list = add(&list, "   padded   ", opts());
        assert_eq!(list[0].text, "padded");
    }

    #[test]
    fn add_rejects_empty_and_long_text() {
        let list = sample();
        assert_eq!(add(&list, "", opts()), list);
        assert_eq!(add(&list, "   ", opts()), list);
        assert_eq!(add(&list, &"x".repeat(201), opts()), list);
        assert_eq!(add(&list, &"x".repeat(200), opts()).len(), 3);
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let text = "가".repeat(200);
        assert!(validate_text(&text).is_ok());
        assert!(validate_text(&"가".repeat(201)).is_err());
    }

    #[test]
    fn line_breaks_collapse_to_single_space() {
        assert_eq!(validate_text("one\r\n\ntwo\nthree").unwrap(), "one two three");
    }

    #[test]
    fn toggle_is_noop_for_unknown_id() {
        let list = sample();
        assert_eq!(toggle_completed(&list, "missing"), list);
        let id = list[0].id.clone();
        let toggled = toggle_completed(&list, &id);
        assert!(toggled[0].completed);
        assert!(!list[0].completed);
    }

    #[test]
    fn move_swaps_neighbours_and_stops_at_edges() {
        let list = sample();
        let (first, second) = (list[0].id.clone(), list[1].id.clone());

        let moved = move_by(&list, &second, Direction::Up);
        assert_eq!(moved[0].id, second);
        assert_eq!(moved[1].id, first);

        assert_eq!(move_by(&list, &first, Direction::Up), list);
        assert_eq!(move_by(&list, &second, Direction::Down), list);
        assert_eq!(move_by(&list, "missing", Direction::Down), list);
    }

    #[test]
    fn move_to_places_task_at_target_index() {
        let mut list = Vec::new();
        for name in ["d", "c", "b", "a"] {
            list = add(&list, name, opts());
        }
        let ids: Vec<String> = list.iter().map(|t| t.id.clone()).collect();

        let moved = move_to(&list, &ids[0], &ids[2]);
        let texts: Vec<&str> = moved.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["b", "c", "a", "d"]);

        let moved = move_to(&list, &ids[3], &ids[1]);
        let texts: Vec<&str> = moved.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "d", "b", "c"]);

        assert_eq!(move_to(&list, &ids[1], &ids[1]), list);
        assert_eq!(move_to(&list, "missing", &ids[1]), list);

        let moved = move_to_end(&list, &ids[0]);
        assert_eq!(moved.last().map(|t| t.text.as_str()), Some("a"));
    }

    #[test]
    fn rename_validates_like_add() {
        let list = sample();
        let id = list[1].id.clone();
        let renamed = rename_text(&list, &id, "  Updated Task ");
        assert_eq!(renamed[1].text, "Updated Task");
        assert_eq!(rename_text(&list, &id, "   "), list);
        assert_eq!(rename_text(&list, &id, &"y".repeat(201)), list);
    }

    #[test]
    fn clear_completed_keeps_active_in_order() {
        let mut list = Vec::new();
        for name in ["e", "d", "c", "b", "a"] {
            list = add(&list, name, opts());
        }
        let ids: Vec<String> = list.iter().map(|t| t.id.clone()).collect();
        list = toggle_completed(&list, &ids[1]);
        list = toggle_completed(&list, &ids[3]);

        let cleared = clear_completed(&list);
        let texts: Vec<&str> = cleared.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "c", "e"]);
        assert_eq!(count_active(&list), 3);
        assert_eq!(count_completed(&list), 2);
    }

    #[test]
    fn partition_is_stable() {
        let mut list = Vec::new();
        for name in ["e", "d", "c", "b", "a"] {
            list = add(&list, name, opts());
        }
        let ids: Vec<String> = list.iter().map(|t| t.id.clone()).collect();
        list = toggle_pinned(&list, &ids[3]);
        list = toggle_pinned(&list, &ids[1]);

        let sorted = stable_partition_pinned(&list);
        let texts: Vec<&str> = sorted.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["b", "d", "a", "c", "e"]);
    }

    #[test]
    fn search_and_filter() {
        let mut list = Vec::new();
        for name in ["Buy groceries", "Walk dog", "buy MILK"] {
            list = add(&list, name, opts());
        }
        assert_eq!(search(&list, "BUY").len(), 2);
        assert_eq!(search(&list, "  ").len(), 3);
        assert!(search(&list, "cat").is_empty());

        let done = list[0].id.clone();
        let list = toggle_completed(&list, &done);
        assert!(filter_by_status(&list, StatusFilter::Active)
            .iter()
            .all(|t| !t.completed));
        assert_eq!(filter_by_status(&list, StatusFilter::Completed).len(), 1);
        assert_eq!(filter_by_status(&list, StatusFilter::All), list);
        assert_eq!(search_filtered(&list, StatusFilter::Active, "buy").len(), 1);
    }

    #[test]
    fn pick_active_skips_completed() {
        let list = sample();
        assert!(pick_active(&[], 7).is_none());
        let done = toggle_completed(&list, &list[0].id);
        for roll in 0..5 {
            assert_eq!(pick_active(&done, roll).map(|t| t.text.as_str()), Some("Task 1"));
        }
    }

    #[test]
    fn parse_direction_and_filter() {
        assert_eq!("UP".parse::<Direction>().unwrap(), Direction::Up);
        assert!("sideways".parse::<Direction>().is_err());
        assert_eq!("completed".parse::<StatusFilter>().unwrap(), StatusFilter::Completed);
        assert!("done".parse::<StatusFilter>().is_err());
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let list = sample();
        let json = serde_json::to_value(&list[1]).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("emoji").is_none());
        assert!(json.get("postponedUntil").is_none());
    }

    #[test]
    fn repair_fixes_ids_text_and_dates() {
        let raw = serde_json::json!([
            { "id": 17, "text": "numeric id", "completed": true, "createdAt": "2026-10-01T00:00:00Z" },
            { "id": "17", "text": "duplicate", "createdAt": "2026-10-01T00:00:00Z" },
            { "text": "" },
            { "id": "long", "text": "z".repeat(250) }
        ]);
        let stored: Vec<StoredTask> = serde_json::from_value(raw).unwrap();
        let (tasks, issues) = repair(stored, at(12));

        assert_eq!(tasks.len(), 4);
        assert_eq!(tasks[0].id, "17");
        assert!(tasks[0].completed);
        assert_ne!(tasks[1].id, "17");
        assert_eq!(tasks[2].text, PLACEHOLDER_TEXT);
        assert_eq!(tasks[2].created_at, at(12));
        assert_eq!(tasks[3].text.chars().count(), TEXT_MAX_LEN);

        let ids: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids.len(), 4);
        assert!(issues.iter().any(|issue| issue.contains("duplicate id 17")));
        assert!(issues.iter().any(|issue| issue.contains("truncated")));
    }

    #[test]
    fn repair_coerces_mistyped_fields() {
        let raw = serde_json::json!([
            { "id": "a", "text": "flag as number", "completed": 1, "pinned": "", "createdAt": "2026-10-01T00:00:00Z" },
            { "id": "b", "text": "bad date", "createdAt": "Invalid Date", "postponedUntil": "later", "emoji": 7 },
            { "id": "c", "text": "epoch", "completed": 0, "createdAt": 1_790_000_000_000_i64 }
        ]);
        let stored: Vec<StoredTask> = raw
            .as_array()
            .unwrap()
            .iter()
            .cloned()
            .map(|entry| StoredTask::from_entry(entry).unwrap())
            .collect();
        let (tasks, issues) = repair(stored, at(12));

        assert_eq!(tasks.len(), 3);
        assert!(tasks[0].completed);
        assert!(!tasks[0].pinned);
        assert_eq!(tasks[1].created_at, at(12));
        assert_eq!(tasks[1].postponed_until, None);
        assert_eq!(tasks[1].emoji, None);
        assert!(!tasks[2].completed);
        assert_eq!(tasks[2].created_at.timestamp_millis(), 1_790_000_000_000);
        assert!(issues.iter().any(|issue| issue.contains("unreadable createdAt")));
        assert!(issues.iter().any(|issue| issue.contains("completed was 1")));
    }

    #[test]
    fn only_objects_are_task_records() {
        assert!(StoredTask::from_entry(serde_json::json!("text")).is_none());
        assert!(StoredTask::from_entry(serde_json::json!(null)).is_none());
        assert!(StoredTask::from_entry(serde_json::json!({})).is_some());
    }
}
