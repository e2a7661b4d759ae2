//! Color constants for the terminal user interface.

use ratatui::style::Color;

use crate::fields::Status;

/// Used for todo tasks and columns.
pub const SLATE: Color = Color::Rgb(107, 114, 128);
/// Used for in-progress tasks and columns.
pub const SKY: Color = Color::Rgb(59, 130, 246);
/// Used for delayed tasks and columns.
pub const CORAL: Color = Color::Rgb(239, 68, 68);
/// Used for completed tasks and columns.
pub const MOSS: Color = Color::Rgb(16, 185, 129);
/// Used for the high-priority marker.
pub const AMBER: Color = Color::Rgb(245, 158, 11);

/// Theme color for a task status.
pub fn status_color(status: Status) -> Color {
    match status {
        Status::Todo => SLATE,
        Status::InProgress => SKY,
        Status::Delayed => CORAL,
        Status::Completed => MOSS,
    }
}
