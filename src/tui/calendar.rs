//! Calendar view: a month grid bucketing tasks by due date, with a
//! task list for the selected day.

use chrono::{Datelike, Duration, NaiveDate};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::fields::format_status;
use crate::task::{today, truncate, Task};
use crate::tui::colors::status_color;

/// The weeks of a month as rows of seven days, Sunday-start, padded
/// with the neighbouring months' days.
pub fn month_grid(year: i32, month: u32) -> Vec<[NaiveDate; 7]> {
    let first = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_default();
    let start = first - Duration::days(first.weekday().num_days_from_sunday() as i64);

    let mut weeks = Vec::new();
    let mut day = start;
    loop {
        let mut week = [day; 7];
        for slot in week.iter_mut() {
            *slot = day;
            day += Duration::days(1);
        }
        weeks.push(week);
        if day.month() != month || day.year() != year {
            break;
        }
    }
    weeks
}

/// Tasks due on the given day.
pub fn tasks_on<'a>(tasks: &'a [Task], day: NaiveDate) -> Vec<&'a Task> {
    tasks.iter().filter(|t| t.due == day).collect()
}

/// First day of the previous month.
pub fn previous_month(anchor: NaiveDate) -> NaiveDate {
    let (year, month) = if anchor.month() == 1 {
        (anchor.year() - 1, 12)
    } else {
        (anchor.year(), anchor.month() - 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(anchor)
}

/// First day of the next month.
pub fn next_month(anchor: NaiveDate) -> NaiveDate {
    let (year, month) = if anchor.month() == 12 {
        (anchor.year() + 1, 1)
    } else {
        (anchor.year(), anchor.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(anchor)
}

/// Render the month grid on the left and the selected day's tasks on
/// the right.
pub fn render_calendar(
    f: &mut Frame,
    area: Rect,
    tasks: &[Task],
    anchor: NaiveDate,
    selected: NaiveDate,
) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(area);

    render_grid(f, chunks[0], tasks, anchor, selected);
    render_day_list(f, chunks[1], tasks, selected);
}

fn render_grid(f: &mut Frame, area: Rect, tasks: &[Task], anchor: NaiveDate, selected: NaiveDate) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", anchor.format("%B %Y")));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let weeks = month_grid(anchor.year(), anchor.month());
    let mut constraints = vec![Constraint::Length(1)];
    constraints.extend(weeks.iter().map(|_| Constraint::Min(2)));
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(inner);

    let weekday_cells = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(14); 7])
        .split(rows[0]);
    for (i, name) in ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"].iter().enumerate() {
        f.render_widget(
            Paragraph::new(Span::styled(*name, Style::default().add_modifier(Modifier::BOLD))),
            weekday_cells[i],
        );
    }

    let today = today();
    for (week_idx, week) in weeks.iter().enumerate() {
        let cells = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(14); 7])
            .split(rows[week_idx + 1]);
        for (day_idx, day) in week.iter().enumerate() {
            let due = tasks_on(tasks, *day);
            let mut style = Style::default();
            if day.month() != anchor.month() {
                style = style.fg(Color::DarkGray);
            }
            if *day == today {
                style = style.add_modifier(Modifier::BOLD).fg(Color::Cyan);
            }
            if *day == selected {
                style = style.add_modifier(Modifier::REVERSED);
            }
            let mut lines = vec![Line::from(Span::styled(format!("{:>2}", day.day()), style))];
            if !due.is_empty() {
                lines.push(Line::from(Span::styled(
                    format!("•{}", due.len()),
                    Style::default().fg(status_color(due[0].status)),
                )));
            }
            f.render_widget(Paragraph::new(lines), cells[day_idx]);
        }
    }
}

fn render_day_list(f: &mut Frame, area: Rect, tasks: &[Task], selected: NaiveDate) {
    let due = tasks_on(tasks, selected);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Due {} ({}) ", selected.format("%Y-%m-%d"), due.len()));
    let lines: Vec<Line> = if due.is_empty() {
        vec![Line::from(Span::styled(
            "No tasks due on this day.",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        due.iter()
            .flat_map(|task| {
                vec![
                    Line::from(Span::styled(
                        truncate(&task.title, 34),
                        Style::default().add_modifier(Modifier::BOLD),
                    )),
                    Line::from(vec![
                        Span::styled(
                            format_status(task.status),
                            Style::default().fg(status_color(task.status)),
                        ),
                        Span::raw(format!(
                            "  {}  {}%",
                            task.assignee_label(),
                            task.display_progress()
                        )),
                    ]),
                    Line::from(""),
                ]
            })
            .collect()
    };
    f.render_widget(Paragraph::new(lines).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{Priority, Status};
    use chrono::Utc;

    #[test]
    fn june_2024_grid_starts_on_the_prior_sunday() {
        let weeks = month_grid(2024, 6);
        // 2024-06-01 is a Saturday, so the grid opens on May 26.
        assert_eq!(weeks[0][0], NaiveDate::from_ymd_opt(2024, 5, 26).unwrap());
        assert_eq!(weeks.len(), 6);
        let last = weeks.last().unwrap()[6];
        assert_eq!(last, NaiveDate::from_ymd_opt(2024, 7, 6).unwrap());
    }

    #[test]
    fn month_navigation_wraps_across_years() {
        let jan = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(previous_month(jan), NaiveDate::from_ymd_opt(2023, 12, 1).unwrap());
        let dec = NaiveDate::from_ymd_opt(2024, 12, 5).unwrap();
        assert_eq!(next_month(dec), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
    }

    #[test]
    fn tasks_bucket_by_due_date() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let tasks = vec![
            Task {
                id: "1".into(),
                title: "due today".into(),
                description: String::new(),
                status: Status::Todo,
                priority: Priority::Low,
                assignee: None,
                due: day,
                created_at: Utc::now(),
                progress: 0,
                sub_tasks: Vec::new(),
                comments: Vec::new(),
                tags: Vec::new(),
            },
            Task {
                id: "2".into(),
                title: "due later".into(),
                description: String::new(),
                status: Status::Todo,
                priority: Priority::Low,
                assignee: None,
                due: day + Duration::days(1),
                created_at: Utc::now(),
                progress: 0,
                sub_tasks: Vec::new(),
                comments: Vec::new(),
                tags: Vec::new(),
            },
        ];
        let due = tasks_on(&tasks, day);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].title, "due today");
    }
}
