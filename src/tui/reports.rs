//! Reports view: aggregate statistics over the task collection and
//! per-member workload.

use std::collections::BTreeMap;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::fields::{format_priority, format_status, Priority, Status};
use crate::task::{round_ratio, today, truncate, Task, UNASSIGNED};
use crate::tui::colors::{status_color, AMBER};

/// Days-ahead window for the urgent-tasks panel.
pub const URGENT_WINDOW_DAYS: i64 = 3;

/// Workload figures for one assignee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberStats {
    pub name: String,
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub delayed: usize,
}

impl MemberStats {
    /// Completion rate as a whole percentage.
    pub fn rate(&self) -> u8 {
        round_ratio(self.completed, self.total)
    }
}

/// Task counts per status, in board-column order.
pub fn status_breakdown(tasks: &[Task]) -> [(Status, usize); 4] {
    let mut out = [
        (Status::Todo, 0),
        (Status::InProgress, 0),
        (Status::Delayed, 0),
        (Status::Completed, 0),
    ];
    for task in tasks {
        for entry in out.iter_mut() {
            if entry.0 == task.status {
                entry.1 += 1;
            }
        }
    }
    out
}

/// Task counts per priority, high first.
pub fn priority_breakdown(tasks: &[Task]) -> [(Priority, usize); 3] {
    let mut out = [
        (Priority::High, 0),
        (Priority::Medium, 0),
        (Priority::Low, 0),
    ];
    for task in tasks {
        for entry in out.iter_mut() {
            if entry.0 == task.priority {
                entry.1 += 1;
            }
        }
    }
    out
}

/// Per-assignee workload, keyed by display name and sorted by name.
/// Unassigned tasks are grouped under the placeholder label.
pub fn member_stats(tasks: &[Task]) -> Vec<MemberStats> {
    let mut by_name: BTreeMap<String, MemberStats> = BTreeMap::new();
    for task in tasks {
        let name = task.assignee_label().to_string();
        let entry = by_name.entry(name.clone()).or_insert(MemberStats {
            name,
            total: 0,
            completed: 0,
            in_progress: 0,
            delayed: 0,
        });
        entry.total += 1;
        match task.status {
            Status::Completed => entry.completed += 1,
            Status::InProgress => entry.in_progress += 1,
            Status::Delayed => entry.delayed += 1,
            Status::Todo => {}
        }
    }
    by_name.into_values().collect()
}

/// Overall completion rate across the collection.
pub fn completion_rate(tasks: &[Task]) -> u8 {
    let completed = tasks
        .iter()
        .filter(|t| t.status == Status::Completed)
        .count();
    round_ratio(completed, tasks.len())
}

/// Incomplete tasks due within the urgent window, soonest first.
pub fn urgent_tasks<'a>(tasks: &'a [Task], today: chrono::NaiveDate) -> Vec<&'a Task> {
    let mut urgent: Vec<&Task> = tasks
        .iter()
        .filter(|t| t.is_urgent(today, URGENT_WINDOW_DAYS))
        .collect();
    urgent.sort_by_key(|t| t.due);
    urgent
}

/// Members with at least one task, ranked by completion rate, top
/// five. The unassigned bucket is not a performer.
pub fn top_performers(tasks: &[Task]) -> Vec<MemberStats> {
    let mut ranked: Vec<MemberStats> = member_stats(tasks)
        .into_iter()
        .filter(|m| m.total > 0 && m.name != UNASSIGNED)
        .collect();
    ranked.sort_by(|a, b| b.rate().cmp(&a.rate()).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(5);
    ranked
}

/// Render the reports dashboard.
pub fn render_reports(f: &mut Frame, area: Rect, tasks: &[Task]) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(6)])
        .split(area);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(34), Constraint::Percentage(33), Constraint::Percentage(33)])
        .split(rows[0]);
    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);

    render_status_panel(f, top[0], tasks);
    render_priority_panel(f, top[1], tasks);
    render_urgent_panel(f, top[2], tasks);
    render_member_panel(f, bottom[0], tasks);
    render_performers_panel(f, bottom[1], tasks);
}

fn render_status_panel(f: &mut Frame, area: Rect, tasks: &[Task]) {
    let mut lines: Vec<Line> = status_breakdown(tasks)
        .iter()
        .map(|(status, count)| {
            Line::from(vec![
                Span::styled(
                    format!("{:<12}", format_status(*status)),
                    Style::default().fg(status_color(*status)),
                ),
                Span::raw(count.to_string()),
            ])
        })
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("{}% complete overall", completion_rate(tasks)),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" By status ")),
        area,
    );
}

fn render_priority_panel(f: &mut Frame, area: Rect, tasks: &[Task]) {
    let lines: Vec<Line> = priority_breakdown(tasks)
        .iter()
        .map(|(priority, count)| {
            Line::from(format!("{:<12}{count}", format_priority(*priority)))
        })
        .collect();
    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" By priority ")),
        area,
    );
}

fn render_urgent_panel(f: &mut Frame, area: Rect, tasks: &[Task]) {
    let urgent = urgent_tasks(tasks, today());
    let lines: Vec<Line> = if urgent.is_empty() {
        vec![Line::from(Span::styled(
            "Nothing due soon.",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        urgent
            .iter()
            .map(|task| {
                Line::from(vec![
                    Span::styled("! ", Style::default().fg(AMBER)),
                    Span::raw(format!(
                        "{} ({})",
                        truncate(&task.title, 24),
                        task.due.format("%m-%d")
                    )),
                ])
            })
            .collect()
    };
    f.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Due within {URGENT_WINDOW_DAYS}d ({}) ", urgent.len())),
        ),
        area,
    );
}

fn render_member_panel(f: &mut Frame, area: Rect, tasks: &[Task]) {
    let lines: Vec<Line> = member_stats(tasks)
        .iter()
        .map(|m| {
            Line::from(format!(
                "{:<16}{:>3} tasks  {:>2} done  {:>2} active  {:>2} late  {:>3}%",
                truncate(&m.name, 15),
                m.total,
                m.completed,
                m.in_progress,
                m.delayed,
                m.rate()
            ))
        })
        .collect();
    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Workload ")),
        area,
    );
}

fn render_performers_panel(f: &mut Frame, area: Rect, tasks: &[Task]) {
    let lines: Vec<Line> = top_performers(tasks)
        .iter()
        .enumerate()
        .map(|(rank, m)| {
            Line::from(vec![
                Span::styled(
                    format!("{}. ", rank + 1),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!("{:<16}{:>3}%", truncate(&m.name, 15), m.rate())),
            ])
        })
        .collect();
    f.render_widget(
        Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(" Top performers ")),
        area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, Utc};

    fn task(title: &str, status: Status, assignee: Option<&str>, due_offset: i64) -> Task {
        Task {
            id: title.to_string(),
            title: title.to_string(),
            description: String::new(),
            status,
            priority: Priority::Medium,
            assignee: assignee.map(str::to_string),
            due: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap() + Duration::days(due_offset),
            created_at: Utc::now(),
            progress: 0,
            sub_tasks: Vec::new(),
            comments: Vec::new(),
            tags: Vec::new(),
        }
    }

    #[test]
    fn status_breakdown_counts_each_column() {
        let tasks = vec![
            task("a", Status::Todo, None, 0),
            task("b", Status::Todo, None, 0),
            task("c", Status::Completed, None, 0),
        ];
        let breakdown = status_breakdown(&tasks);
        assert_eq!(breakdown[0], (Status::Todo, 2));
        assert_eq!(breakdown[3], (Status::Completed, 1));
        assert_eq!(completion_rate(&tasks), 33);
    }

    #[test]
    fn member_stats_group_by_name_with_unassigned_bucket() {
        let tasks = vec![
            task("a", Status::Completed, Some("Kim"), 0),
            task("b", Status::InProgress, Some("Kim"), 0),
            task("c", Status::Delayed, Some("Kim"), 0),
            task("d", Status::Todo, None, 0),
        ];
        let stats = member_stats(&tasks);
        assert_eq!(stats.len(), 2);
        let kim = stats.iter().find(|m| m.name == "Kim").unwrap();
        assert_eq!(kim.total, 3);
        assert_eq!(kim.completed, 1);
        assert_eq!(kim.in_progress, 1);
        assert_eq!(kim.delayed, 1);
        assert_eq!(kim.rate(), 33);
        assert!(stats.iter().any(|m| m.name == UNASSIGNED));
    }

    #[test]
    fn urgent_window_excludes_completed_and_distant_tasks() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let tasks = vec![
            task("overdue", Status::Delayed, None, -1),
            task("soon", Status::Todo, None, 2),
            task("done", Status::Completed, None, 0),
            task("far", Status::Todo, None, 10),
        ];
        let urgent = urgent_tasks(&tasks, today);
        let titles: Vec<&str> = urgent.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["overdue", "soon"]);
    }

    #[test]
    fn top_performers_rank_by_rate_and_skip_unassigned() {
        let tasks = vec![
            task("a", Status::Completed, Some("Kim"), 0),
            task("b", Status::Completed, Some("Lee"), 0),
            task("c", Status::Todo, Some("Lee"), 0),
            task("d", Status::Todo, None, 0),
        ];
        let ranked = top_performers(&tasks);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].name, "Kim");
        assert_eq!(ranked[0].rate(), 100);
        assert_eq!(ranked[1].name, "Lee");
    }
}
