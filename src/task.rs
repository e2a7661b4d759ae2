//! Task data structures and related functionality.
//!
//! This module defines the in-memory task graph: `Task` with its owned
//! `SubTask` and `Comment` children, and the `Profile` team-member
//! record. Assignees and authors are carried as display names rather
//! than profile ids, a denormalisation inherited from the remote
//! schema's consumers. Name matching breaks if two profiles share a
//! display name; filtering and grouping depend on it, so it is kept
//! as-is rather than silently switched to id references.

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::fields::*;

/// Placeholder shown wherever an assignee or author is absent, e.g.
/// after the referenced profile was removed.
pub const UNASSIGNED: &str = "unassigned";

/// A unit of work tracked through the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: Status,
    pub priority: Priority,
    pub assignee: Option<String>,
    pub due: NaiveDate,
    pub created_at: DateTime<Utc>,
    /// Stored progress, 0-100. Independently settable when the task has
    /// no sub-tasks; see [`Task::display_progress`] for the derived
    /// value used when sub-tasks exist.
    pub progress: u8,
    pub sub_tasks: Vec<SubTask>,
    pub comments: Vec<Comment>,
    pub tags: Vec<String>,
}

/// A child checklist item of a task, individually assignable and
/// completable. Created and deleted only through its parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubTask {
    pub id: String,
    pub title: String,
    pub completed: bool,
    pub assignee: Option<String>,
    pub memo: Option<String>,
}

/// A comment on a task. Append-only from the UI's perspective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub author: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A team member record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Progress derived from the sub-task completion ratio, or `None`
    /// when the task has no sub-tasks.
    pub fn derived_progress(&self) -> Option<u8> {
        if self.sub_tasks.is_empty() {
            return None;
        }
        let done = self.sub_tasks.iter().filter(|st| st.completed).count();
        Some(round_ratio(done, self.sub_tasks.len()))
    }

    /// Progress shown in views: the sub-task ratio when sub-tasks
    /// exist, otherwise the stored value. The stored value is NOT kept
    /// in step with the ratio, so a task edited to progress=80 with
    /// sub-tasks at 25% keeps both values. Known inconsistency, pending
    /// product clarification.
    pub fn display_progress(&self) -> u8 {
        self.derived_progress().unwrap_or(self.progress)
    }

    /// Case-insensitive search over title, description and assignee.
    pub fn matches_search(&self, term: &str) -> bool {
        if term.is_empty() {
            return true;
        }
        let term = term.to_lowercase();
        self.title.to_lowercase().contains(&term)
            || self.description.to_lowercase().contains(&term)
            || self
                .assignee
                .as_deref()
                .map(|a| a.to_lowercase().contains(&term))
                .unwrap_or(false)
    }

    /// Whether this task is due within `days` days of `today` and not
    /// yet completed. Used for the urgent-tasks report.
    pub fn is_urgent(&self, today: NaiveDate, days: i64) -> bool {
        self.status != Status::Completed && (self.due - today).num_days() <= days
    }

    /// Assignee display name, falling back to the unassigned
    /// placeholder.
    pub fn assignee_label(&self) -> &str {
        self.assignee.as_deref().unwrap_or(UNASSIGNED)
    }
}

impl Comment {
    /// Author display name, falling back to the unassigned placeholder
    /// when the authoring profile no longer exists.
    pub fn author_label(&self) -> &str {
        self.author.as_deref().unwrap_or(UNASSIGNED)
    }
}

/// Round a completed/total ratio to a whole percentage.
pub fn round_ratio(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as u8
}

/// Normalise a tag string by trimming, lowercasing, and replacing
/// spaces with hyphens.
pub fn normalise_tag(s: &str) -> String {
    s.trim().to_lowercase().replace(' ', "-")
}

/// Split comma-separated tag strings and normalise each tag.
pub fn split_and_normalise_tags(inputs: &[String]) -> Vec<String> {
    let mut tags = Vec::new();
    for raw in inputs {
        for part in raw.split(',') {
            let tag = normalise_tag(part);
            if !tag.is_empty() {
                tags.push(tag);
            }
        }
    }
    tags.sort();
    tags.dedup();
    tags
}

/// Format a due date relative to today ("today", "tomorrow", "in 3d",
/// "2d late").
pub fn format_due_relative(due: NaiveDate, today: NaiveDate) -> String {
    let delta = (due - today).num_days();
    if delta == 0 {
        "today".into()
    } else if delta == 1 {
        "tomorrow".into()
    } else if delta > 1 {
        format!("in {delta}d")
    } else {
        format!("{}d late", -delta)
    }
}

/// Calculate the start and end dates of the current ISO week (Monday to
/// Sunday).
pub fn start_end_of_this_week(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    use chrono::Datelike;
    let weekday = today.weekday().num_days_from_monday() as i64;
    let start = today - Duration::days(weekday);
    let end = start + Duration::days(6);
    (start, end)
}

/// Today's date in the local timezone.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}
