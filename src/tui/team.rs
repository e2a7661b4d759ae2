//! Team view: the member directory with roles, contact details and
//! per-member task counts.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Row, Table, TableState},
    Frame,
};

use crate::fields::{format_role, Role};
use crate::task::{Profile, Task};

/// Render the member table. `tasks` supplies the open-task counts.
pub fn render_team(
    f: &mut Frame,
    area: Rect,
    profiles: &[Profile],
    tasks: &[Task],
    state: &mut TableState,
) {
    let header = Row::new(
        ["Name", "Role", "Phone", "Joined", "Assigned"]
            .iter()
            .map(|h| Cell::from(*h).style(Style::default().add_modifier(Modifier::BOLD))),
    );

    let body: Vec<Row> = profiles
        .iter()
        .map(|profile| {
            let assigned = tasks
                .iter()
                .filter(|t| t.assignee.as_deref() == Some(profile.name.as_str()))
                .count();
            let role_style = match profile.role {
                Role::Admin => Style::default().fg(Color::Magenta),
                Role::Manager => Style::default().fg(Color::Blue),
                Role::User => Style::default(),
            };
            Row::new(vec![
                Cell::from(profile.name.clone()),
                Cell::from(format_role(profile.role)).style(role_style),
                Cell::from(profile.phone.clone().unwrap_or_default()),
                Cell::from(profile.created_at.format("%Y-%m-%d").to_string()),
                Cell::from(assigned.to_string()),
            ])
        })
        .collect();

    let widths = [
        ratatui::layout::Constraint::Min(16),
        ratatui::layout::Constraint::Length(9),
        ratatui::layout::Constraint::Length(14),
        ratatui::layout::Constraint::Length(11),
        ratatui::layout::Constraint::Length(9),
    ];
    let table = Table::new(body, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Team ({}) ", profiles.len())),
        )
        .row_highlight_style(Style::default().bg(Color::Gray).fg(Color::Black))
        .highlight_symbol(">> ");

    f.render_stateful_widget(table, area, state);
}
