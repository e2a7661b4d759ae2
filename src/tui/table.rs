//! Task table view: the full collection as a sortable, filterable
//! table.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Row, Table, TableState},
    Frame,
};

use crate::fields::{format_priority, format_status, SortKey, Status};
use crate::task::{format_due_relative, today, truncate, Task};

/// Filter and sort the collection for display. Returns references in
/// row order.
pub fn table_rows<'a>(tasks: &'a [Task], search: &str, sort: SortKey) -> Vec<&'a Task> {
    let mut rows: Vec<&Task> = tasks.iter().filter(|t| t.matches_search(search)).collect();
    match sort {
        SortKey::Due => rows.sort_by_key(|t| t.due),
        // High first.
        SortKey::Priority => rows.sort_by(|a, b| b.priority.cmp(&a.priority)),
        SortKey::Created => rows.sort_by_key(|t| t.created_at),
    }
    rows
}

/// Render the task table.
pub fn render_table(
    f: &mut Frame,
    area: Rect,
    rows: &[&Task],
    state: &mut TableState,
    total: usize,
) {
    let today = today();
    let header = Row::new(
        ["Title", "Status", "Priority", "Assignee", "Due", "Progress", "Tags"]
            .iter()
            .map(|h| Cell::from(*h).style(Style::default().add_modifier(Modifier::BOLD))),
    )
    .height(1);

    let body: Vec<Row> = rows
        .iter()
        .map(|task| {
            let style = match task.status {
                Status::Completed => Style::default().fg(Color::DarkGray),
                Status::Delayed => Style::default().fg(Color::Red),
                _ => Style::default(),
            };
            Row::new(vec![
                Cell::from(truncate(&task.title, 32)),
                Cell::from(format_status(task.status)),
                Cell::from(format_priority(task.priority)),
                Cell::from(task.assignee_label().to_string()),
                Cell::from(format_due_relative(task.due, today)),
                Cell::from(format!("{}%", task.display_progress())),
                Cell::from(task.tags.join(",")),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        ratatui::layout::Constraint::Min(25),
        ratatui::layout::Constraint::Length(12),
        ratatui::layout::Constraint::Length(9),
        ratatui::layout::Constraint::Length(14),
        ratatui::layout::Constraint::Length(10),
        ratatui::layout::Constraint::Length(9),
        ratatui::layout::Constraint::Length(16),
    ];
    let table = Table::new(body, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Tasks ({}/{total})", rows.len())),
        )
        .row_highlight_style(Style::default().bg(Color::Gray).fg(Color::Black))
        .highlight_symbol(">> ");

    f.render_stateful_widget(table, area, state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Priority;
    use chrono::{Duration, NaiveDate, Utc};

    fn task(title: &str, priority: Priority, due_offset: i64) -> Task {
        Task {
            id: title.to_string(),
            title: title.to_string(),
            description: String::new(),
            status: Status::Todo,
            priority,
            assignee: None,
            due: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap() + Duration::days(due_offset),
            created_at: Utc::now() + Duration::seconds(due_offset),
            progress: 0,
            sub_tasks: Vec::new(),
            comments: Vec::new(),
            tags: Vec::new(),
        }
    }

    #[test]
    fn sorts_by_due_date() {
        let tasks = vec![
            task("late", Priority::Low, 5),
            task("soon", Priority::Low, 1),
        ];
        let rows = table_rows(&tasks, "", SortKey::Due);
        assert_eq!(rows[0].title, "soon");
    }

    #[test]
    fn sorts_high_priority_first() {
        let tasks = vec![
            task("minor", Priority::Low, 0),
            task("major", Priority::High, 0),
            task("normal", Priority::Medium, 0),
        ];
        let rows = table_rows(&tasks, "", SortKey::Priority);
        let titles: Vec<&str> = rows.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["major", "normal", "minor"]);
    }

    #[test]
    fn search_narrows_rows() {
        let tasks = vec![
            task("write spec", Priority::Low, 0),
            task("fix tests", Priority::Low, 0),
        ];
        assert_eq!(table_rows(&tasks, "spec", SortKey::Due).len(), 1);
    }
}
