//! Task data model.
//!
//! Mirrors the row shape of the hosted `tasks` table and carries the pure
//! date arithmetic used by the reminder scheduler and the overdue check.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::clock::Clock;

/// Title stored when a task is inserted without one.
pub const UNTITLED_TASK: &str = "Untitled Task";

/// Task urgency.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl std::fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task lifecycle state.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored task row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Opaque identifier, stable for the task's lifetime.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Calendar due date (local).
    #[serde(default, with = "due_date_format")]
    pub due_date: Option<NaiveDate>,
    /// 24h `"HH:MM"` time of day.
    #[serde(default)]
    pub due_time: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub priority: TaskPriority,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: TaskStatus,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    /// Lead time in minutes before the due instant.
    #[serde(default)]
    pub reminder_minutes: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_recurring: bool,
    #[serde(default)]
    pub recurring_pattern: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Minimal task, mostly useful for tests and fixtures.
    pub fn new(id: impl Into<String>, user_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            title: title.into(),
            description: None,
            due_date: None,
            due_time: None,
            priority: TaskPriority::default(),
            status: TaskStatus::default(),
            category: None,
            tags: Vec::new(),
            reminder_minutes: None,
            is_recurring: false,
            recurring_pattern: None,
            created_at: None,
            updated_at: None,
            completed_at: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Reminder lead time, with `0` treated as absent.
    pub fn reminder_lead(&self) -> Option<u32> {
        self.reminder_minutes.filter(|m| *m > 0)
    }

    /// Due instant used for reminders.
    ///
    /// The due date at local midnight, with hour and minute replaced from
    /// `due_time` when present. A date-only task is due at 00:00 here, not at
    /// the end of the day. `"24:00"` means midnight at the end of the due
    /// date. Returns `None` without a due date or when `due_time` is
    /// malformed.
    pub fn due_date_time(&self) -> Option<NaiveDateTime> {
        let date = self.due_date?;
        match self.due_time.as_deref() {
            None => Some(date.and_time(NaiveTime::MIN)),
            Some(raw) if is_end_of_day(raw) => {
                date.succ_opt().map(|next| next.and_time(NaiveTime::MIN))
            }
            Some(raw) => parse_due_time(raw).map(|time| date.and_time(time)),
        }
    }

    /// Instant at which the reminder should fire, if the task has one.
    ///
    /// The due wall time is resolved in `clock`'s zone first and the lead
    /// time is then taken off in real minutes.
    pub fn reminder_at(&self, clock: &dyn Clock) -> Option<DateTime<Utc>> {
        let lead = self.reminder_lead()?;
        let due = clock.resolve_local(self.due_date_time()?);
        Some(due - TimeDelta::minutes(i64::from(lead)))
    }

    /// Whether the task is past due at `now`.
    ///
    /// A date-only task counts as due at 23:59:59 of its day.
    pub fn is_overdue(&self, now: NaiveDateTime) -> bool {
        let Some(date) = self.due_date else {
            return false;
        };
        let deadline = if self.due_time.is_some() {
            match self.due_date_time() {
                Some(deadline) => deadline,
                None => return false,
            }
        } else {
            date.and_time(end_of_day())
        };
        deadline < now
    }

    /// Whether the session layer should arm a reminder for this task.
    pub fn wants_reminder(&self) -> bool {
        self.reminder_lead().is_some() && self.due_date.is_some() && !self.is_completed()
    }

    /// Which list section the task belongs to at `now`.
    pub fn due_bucket(&self, now: NaiveDateTime) -> DueBucket {
        if self.is_completed() {
            return DueBucket::Completed;
        }
        match self.due_date {
            None => DueBucket::NoDate,
            Some(_) if self.is_overdue(now) => DueBucket::Overdue,
            Some(date) if date == now.date() => DueBucket::Today,
            Some(_) => DueBucket::Upcoming,
        }
    }
}

/// List section of a task, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DueBucket {
    Overdue,
    Today,
    Upcoming,
    NoDate,
    Completed,
}

/// Summary counts over a task list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub urgent: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    /// Open tasks past their deadline.
    pub overdue: usize,
    /// Open tasks whose due date is today, overdue ones included.
    pub due_today: usize,
}

impl TaskStats {
    pub fn collect<'a>(tasks: impl IntoIterator<Item = &'a Task>, now: NaiveDateTime) -> Self {
        let mut stats = Self::default();
        for task in tasks {
            stats.total += 1;
            match task.status {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::InProgress => stats.in_progress += 1,
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::Cancelled => stats.cancelled += 1,
            }
            match task.priority {
                TaskPriority::Urgent => stats.urgent += 1,
                TaskPriority::High => stats.high += 1,
                TaskPriority::Medium => stats.medium += 1,
                TaskPriority::Low => stats.low += 1,
            }
            if task.is_completed() {
                continue;
            }
            if task.is_overdue(now) {
                stats.overdue += 1;
            }
            if task.due_date == Some(now.date()) {
                stats.due_today += 1;
            }
        }
        stats
    }

    /// Completed share of all tasks as a whole percentage, `0` when empty.
    pub fn completion_rate(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let rate = (self.completed as f64 / self.total as f64 * 100.0).round();
        rate.clamp(0.0, 100.0) as u8
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

/// Parse a 24h `"HH:MM"` (or `"HH:MM:SS"`) time of day.
///
/// Seconds are ignored. `"24:00"` is not a time of day and yields `None`;
/// [`Task::due_date_time`] handles it separately.
pub fn parse_due_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
        .and_then(|time| time.with_second(0))
}

fn is_end_of_day(raw: &str) -> bool {
    matches!(raw.trim(), "24:00" | "24:00:00")
}

/// Insert payload for a new task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewTask {
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    #[serde(with = "due_date_format")]
    pub due_date: Option<NaiveDate>,
    pub due_time: Option<String>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub reminder_minutes: Option<u32>,
    pub is_recurring: bool,
    pub recurring_pattern: Option<String>,
}

impl NewTask {
    pub fn new(user_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    /// Materialize a row with the given id and creation time.
    ///
    /// Blank titles become [`UNTITLED_TASK`]; empty optional strings and a
    /// zero lead time are stored as absent.
    pub fn into_task(self, id: String, now: DateTime<Utc>) -> Task {
        let title = if self.title.trim().is_empty() {
            UNTITLED_TASK.to_owned()
        } else {
            self.title
        };
        let completed_at = (self.status == TaskStatus::Completed).then_some(now);
        Task {
            id,
            user_id: self.user_id,
            title,
            description: non_empty(self.description),
            due_date: self.due_date,
            due_time: non_empty(self.due_time),
            priority: self.priority,
            status: self.status,
            category: non_empty(self.category),
            tags: self.tags,
            reminder_minutes: self.reminder_minutes.filter(|m| *m > 0),
            is_recurring: self.is_recurring,
            recurring_pattern: non_empty(self.recurring_pattern),
            created_at: Some(now),
            updated_at: Some(now),
            completed_at,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Partial update. `None` leaves a column untouched; for nullable columns
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub due_date: Option<Option<NaiveDate>>,
    pub due_time: Option<Option<String>>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub category: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub reminder_minutes: Option<Option<u32>>,
    pub is_recurring: Option<bool>,
    pub recurring_pattern: Option<Option<String>>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Whether this patch explicitly marks the task completed.
    pub fn completes(&self) -> bool {
        self.status == Some(TaskStatus::Completed)
    }

    /// Apply the patch in place and bump `updated_at`.
    ///
    /// Entering `completed` stamps `completed_at`; leaving it clears the stamp.
    pub fn apply_to(self, task: &mut Task, now: DateTime<Utc>) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(due_time) = self.due_time {
            task.due_time = due_time;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(status) = self.status {
            if status == TaskStatus::Completed && task.status != TaskStatus::Completed {
                task.completed_at = Some(now);
            } else if status != TaskStatus::Completed {
                task.completed_at = None;
            }
            task.status = status;
        }
        if let Some(category) = self.category {
            task.category = category;
        }
        if let Some(tags) = self.tags {
            task.tags = tags;
        }
        if let Some(reminder_minutes) = self.reminder_minutes {
            task.reminder_minutes = reminder_minutes.filter(|m| *m > 0);
        }
        if let Some(is_recurring) = self.is_recurring {
            task.is_recurring = is_recurring;
        }
        if let Some(recurring_pattern) = self.recurring_pattern {
            task.recurring_pattern = recurring_pattern;
        }
        task.updated_at = Some(now);
    }
}

/// List filter. Empty criteria match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub statuses: Vec<TaskStatus>,
    pub priorities: Vec<TaskPriority>,
    pub categories: Vec<String>,
    /// Inclusive due-date range. Tasks without a due date never match.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    /// Case-insensitive substring of title or description.
    pub search: Option<String>,
    /// Matches when the task carries any of these tags.
    pub tags: Vec<String>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&task.status) {
            return false;
        }
        if !self.priorities.is_empty() && !self.priorities.contains(&task.priority) {
            return false;
        }
        if !self.categories.is_empty() {
            match &task.category {
                Some(category) if self.categories.contains(category) => {}
                _ => return false,
            }
        }
        if let Some((start, end)) = self.date_range {
            match task.due_date {
                Some(date) if date >= start && date <= end => {}
                _ => return false,
            }
        }
        if let Some(needle) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = needle.to_lowercase();
            let in_title = task.title.to_lowercase().contains(&needle);
            let in_description = task
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle));
            if !in_title && !in_description {
                return false;
            }
        }
        if !self.tags.is_empty() && !task.tags.iter().any(|t| self.tags.contains(t)) {
            return false;
        }
        true
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Due dates are written as `YYYY-MM-DD`. Reads also accept a full RFC 3339
/// timestamp, whose local calendar date is used.
mod due_date_format {
    use super::*;
    use serde::Serializer;

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S>(value: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(date) => serializer.serialize_str(&date.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(raw) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        if let Ok(date) = NaiveDate::parse_from_str(raw, FORMAT) {
            return Ok(Some(date));
        }
        if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
            return Ok(Some(stamp.with_timezone(&Local).date_naive()));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
            return Ok(Some(naive.date()));
        }
        Err(serde::de::Error::custom(format!("invalid due date: {raw}")))
    }
}
