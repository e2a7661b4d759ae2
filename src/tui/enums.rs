//! Enumerations for TUI state management.

/// The view tabs of the application, in switcher order.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ViewTab {
    Kanban,
    Table,
    Calendar,
    Reports,
    Team,
}

impl ViewTab {
    pub const ALL: [ViewTab; 5] = [
        ViewTab::Kanban,
        ViewTab::Table,
        ViewTab::Calendar,
        ViewTab::Reports,
        ViewTab::Team,
    ];

    pub fn title(self) -> &'static str {
        match self {
            ViewTab::Kanban => "Kanban",
            ViewTab::Table => "Table",
            ViewTab::Calendar => "Calendar",
            ViewTab::Reports => "Reports",
            ViewTab::Team => "Team",
        }
    }

    pub fn next(self) -> ViewTab {
        let idx = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}
