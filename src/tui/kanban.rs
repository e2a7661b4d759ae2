//! Kanban board view: one column per status, cards filtered by the
//! search term.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::fields::{format_priority, format_status, Priority, Status};
use crate::task::{format_due_relative, today, truncate, Task};
use crate::tui::colors::{status_color, AMBER};

/// Tasks grouped into the four status columns, search filter applied.
/// Column order follows [`Status::ALL`].
pub fn kanban_columns<'a>(tasks: &'a [Task], search: &str) -> [Vec<&'a Task>; 4] {
    let mut columns: [Vec<&Task>; 4] = Default::default();
    for task in tasks.iter().filter(|t| t.matches_search(search)) {
        let idx = Status::ALL
            .iter()
            .position(|s| *s == task.status)
            .unwrap_or(0);
        columns[idx].push(task);
    }
    columns
}

/// Render the board. `selected` is (column, card) of the highlighted
/// card.
pub fn render_kanban(
    f: &mut Frame,
    area: Rect,
    columns: &[Vec<&Task>; 4],
    selected: (usize, usize),
) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(25); 4])
        .split(area);

    let today = today();
    for (col_idx, (status, tasks)) in Status::ALL.iter().zip(columns.iter()).enumerate() {
        let color = status_color(*status);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color))
            .title(format!(" {} ({}) ", format_status(*status), tasks.len()));
        let inner = block.inner(chunks[col_idx]);
        f.render_widget(block, chunks[col_idx]);

        // Three lines per card.
        let card_rows: Vec<Constraint> = tasks.iter().map(|_| Constraint::Length(3)).collect();
        let card_areas = Layout::default()
            .direction(Direction::Vertical)
            .constraints(card_rows)
            .split(inner);

        for (card_idx, task) in tasks.iter().enumerate() {
            if card_idx >= card_areas.len() {
                break;
            }
            let is_selected = selected == (col_idx, card_idx);
            let marker = if task.priority == Priority::High {
                Span::styled("! ", Style::default().fg(AMBER).add_modifier(Modifier::BOLD))
            } else {
                Span::raw("  ")
            };
            let title_style = if is_selected {
                Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED)
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            };
            let lines = vec![
                Line::from(vec![marker, Span::styled(truncate(&task.title, 28), title_style)]),
                Line::from(vec![
                    Span::raw(task.assignee_label().to_string()),
                    Span::raw("  "),
                    Span::raw(format_due_relative(task.due, today)),
                    Span::raw("  "),
                    Span::raw(format!("{}%", task.display_progress())),
                ]),
                Line::from(Span::styled(
                    format!("{} priority", format_priority(task.priority)),
                    Style::default().fg(color),
                )),
            ];
            f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), card_areas[card_idx]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Priority;
    use chrono::{NaiveDate, Utc};

    fn task(title: &str, status: Status, assignee: &str) -> Task {
        Task {
            id: title.to_string(),
            title: title.to_string(),
            description: String::new(),
            status,
            priority: Priority::Medium,
            assignee: Some(assignee.to_string()),
            due: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            created_at: Utc::now(),
            progress: 0,
            sub_tasks: Vec::new(),
            comments: Vec::new(),
            tags: Vec::new(),
        }
    }

    #[test]
    fn tasks_land_in_their_status_column() {
        let tasks = vec![
            task("a", Status::Todo, "Kim"),
            task("b", Status::InProgress, "Lee"),
            task("c", Status::Delayed, "Kim"),
            task("d", Status::Completed, "Lee"),
            task("e", Status::InProgress, "Kim"),
        ];
        let columns = kanban_columns(&tasks, "");
        assert_eq!(columns[0].len(), 1);
        assert_eq!(columns[1].len(), 2);
        assert_eq!(columns[2].len(), 1);
        assert_eq!(columns[3].len(), 1);
    }

    #[test]
    fn search_filters_across_all_columns() {
        let tasks = vec![
            task("launch page", Status::Todo, "Kim"),
            task("fix login", Status::InProgress, "Lee"),
        ];
        let columns = kanban_columns(&tasks, "kim");
        assert_eq!(columns[0].len(), 1);
        assert_eq!(columns[1].len(), 0);
    }
}
