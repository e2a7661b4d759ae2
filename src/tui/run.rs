//! Dashboard TUI entry point and terminal setup.

use std::io;
use std::sync::Arc;

use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{prelude::CrosstermBackend, Terminal};

use crate::http::HttpStore;
use crate::sync::TaskSync;
use crate::team::TeamDirectory;
use crate::tui::app::App;

/// Initialise the terminal, run the dashboard, and restore the
/// terminal on the way out.
pub fn run_dashboard(
    sync: Arc<TaskSync<HttpStore>>,
    team: Arc<TeamDirectory<HttpStore>>,
    handle: tokio::runtime::Handle,
) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(sync, team, handle);
    let result = app.run(&mut terminal);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}
