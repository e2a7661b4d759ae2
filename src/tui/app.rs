//! Main application logic for the terminal dashboard.
//!
//! The `App` struct owns the TUI state, handles user input, renders the
//! five views, and drives mutations through the synchronisation hub.
//! Mutations are spawned onto the runtime and never awaited in the
//! event loop; the loop polls at a fixed interval, drains outcome
//! notices into the status line, and re-snapshots the task list so the
//! display reflects pending overlays immediately.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use crossterm::event::{self, Event, KeyCode};
use parking_lot::Mutex;
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, TableState, Wrap},
    Frame, Terminal,
};

use crate::cmd::parse_due;
use crate::fields::{format_priority, format_status, Priority, SortKey, Status};
use crate::http::HttpStore;
use crate::repo::NewTask;
use crate::store::TaskPatch;
use crate::sync::{Notice, TaskSync};
use crate::task::{today, truncate, Profile, Task};
use crate::team::TeamDirectory;
use crate::tui::{
    calendar::{next_month, previous_month, render_calendar},
    colors::status_color,
    enums::ViewTab,
    kanban::{kanban_columns, render_kanban},
    reports::render_reports,
    table::{render_table, table_rows},
    team::render_team,
    utils::centered_rect,
};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Text entry target, when a prompt is open.
#[derive(PartialEq, Eq)]
enum InputMode {
    None,
    Search,
}

/// What a submitted prompt value feeds. Multi-field entry chains one
/// prompt into the next, carrying earlier answers along.
enum PromptKind {
    NewTaskTitle,
    NewTaskAssignee { title: String },
    NewTaskDue { title: String, assignee: String },
    SubTaskTitle { task_id: String },
    CommentAuthor { task_id: String },
    CommentContent { task_id: String, author: String },
    SubTaskAssignee { sub_task_id: String },
    SubTaskMemo { sub_task_id: String },
}

/// A line-editing prompt shown in the status bar.
struct Prompt {
    kind: PromptKind,
    buffer: String,
}

/// Mutation produced by a completed prompt chain.
enum PromptAction {
    CreateTask(NewTask),
    AddSubTask { task_id: String, title: String },
    AddComment { task_id: String, author: String, content: String },
    AssignSubTask { sub_task_id: String, assignee: String },
    SaveMemo { sub_task_id: String, memo: String },
}

/// Where a submitted prompt value leads.
enum PromptStep {
    Chain(PromptKind),
    Retry { kind: PromptKind, message: &'static str },
    Submit(PromptAction),
}

/// Resolve one submitted prompt value. Required fields left empty and
/// unparsable dates reopen the same prompt; the memo field may be
/// cleared with empty text.
fn advance_prompt(kind: PromptKind, value: &str) -> PromptStep {
    let value = value.to_string();
    match kind {
        PromptKind::NewTaskTitle => {
            if value.is_empty() {
                return PromptStep::Retry {
                    kind: PromptKind::NewTaskTitle,
                    message: "title is required",
                };
            }
            PromptStep::Chain(PromptKind::NewTaskAssignee { title: value })
        }
        PromptKind::NewTaskAssignee { title } => {
            if value.is_empty() {
                return PromptStep::Retry {
                    kind: PromptKind::NewTaskAssignee { title },
                    message: "assignee is required",
                };
            }
            PromptStep::Chain(PromptKind::NewTaskDue {
                title,
                assignee: value,
            })
        }
        PromptKind::NewTaskDue { title, assignee } => {
            let due = match parse_due(&value) {
                Ok(d) => d,
                Err(_) => {
                    return PromptStep::Retry {
                        kind: PromptKind::NewTaskDue { title, assignee },
                        message: "unrecognised date",
                    };
                }
            };
            let new = NewTask {
                title,
                description: String::new(),
                status: Status::Todo,
                priority: Priority::Medium,
                assignee,
                due,
                progress: 0,
                tags: Vec::new(),
            };
            if new.validate().is_err() {
                return PromptStep::Retry {
                    kind: PromptKind::NewTaskTitle,
                    message: "title and assignee are required",
                };
            }
            PromptStep::Submit(PromptAction::CreateTask(new))
        }
        PromptKind::SubTaskTitle { task_id } => {
            if value.is_empty() {
                return PromptStep::Retry {
                    kind: PromptKind::SubTaskTitle { task_id },
                    message: "title is required",
                };
            }
            PromptStep::Submit(PromptAction::AddSubTask {
                task_id,
                title: value,
            })
        }
        PromptKind::CommentAuthor { task_id } => {
            if value.is_empty() {
                return PromptStep::Retry {
                    kind: PromptKind::CommentAuthor { task_id },
                    message: "author is required",
                };
            }
            PromptStep::Chain(PromptKind::CommentContent {
                task_id,
                author: value,
            })
        }
        PromptKind::CommentContent { task_id, author } => {
            if value.is_empty() {
                return PromptStep::Retry {
                    kind: PromptKind::CommentContent { task_id, author },
                    message: "comment text is required",
                };
            }
            PromptStep::Submit(PromptAction::AddComment {
                task_id,
                author,
                content: value,
            })
        }
        PromptKind::SubTaskAssignee { sub_task_id } => {
            if value.is_empty() {
                return PromptStep::Retry {
                    kind: PromptKind::SubTaskAssignee { sub_task_id },
                    message: "member name is required",
                };
            }
            PromptStep::Submit(PromptAction::AssignSubTask {
                sub_task_id,
                assignee: value,
            })
        }
        PromptKind::SubTaskMemo { sub_task_id } => PromptStep::Submit(PromptAction::SaveMemo {
            sub_task_id,
            memo: value,
        }),
    }
}

impl Prompt {
    fn label(&self) -> &'static str {
        match self.kind {
            PromptKind::NewTaskTitle => "new task title",
            PromptKind::NewTaskAssignee { .. } => "assignee",
            PromptKind::NewTaskDue { .. } => "due (YYYY-MM-DD, today, tomorrow, in Nd)",
            PromptKind::SubTaskTitle { .. } => "new sub-task title",
            PromptKind::CommentAuthor { .. } => "comment author",
            PromptKind::CommentContent { .. } => "comment",
            PromptKind::SubTaskAssignee { .. } => "sub-task assignee",
            PromptKind::SubTaskMemo { .. } => "memo",
        }
    }
}

/// The detail popup: which task is open and which sub-task row is
/// highlighted.
struct DetailState {
    task_id: String,
    sub_task_index: usize,
}

/// Terminal dashboard state.
pub struct App {
    sync: Arc<TaskSync<HttpStore>>,
    team: Arc<TeamDirectory<HttpStore>>,
    handle: tokio::runtime::Handle,
    view: ViewTab,
    tasks: Vec<Task>,
    profiles: Vec<Profile>,
    incoming_profiles: Arc<Mutex<Option<Vec<Profile>>>>,
    search: String,
    input_mode: InputMode,
    status_message: String,
    status_is_error: bool,
    kanban_selected: (usize, usize),
    table_state: TableState,
    sort: SortKey,
    calendar_anchor: NaiveDate,
    calendar_selected: NaiveDate,
    team_state: TableState,
    detail: Option<DetailState>,
    confirm_delete: Option<String>,
    prompt: Option<Prompt>,
}

impl App {
    pub fn new(
        sync: Arc<TaskSync<HttpStore>>,
        team: Arc<TeamDirectory<HttpStore>>,
        handle: tokio::runtime::Handle,
    ) -> Self {
        let today = today();
        let mut app = App {
            sync,
            team,
            handle,
            view: ViewTab::Kanban,
            tasks: Vec::new(),
            profiles: Vec::new(),
            incoming_profiles: Arc::new(Mutex::new(None)),
            search: String::new(),
            input_mode: InputMode::None,
            status_message: String::new(),
            status_is_error: false,
            kanban_selected: (0, 0),
            table_state: TableState::default(),
            sort: SortKey::Due,
            calendar_anchor: NaiveDate::from_ymd_opt(today.year(), today.month(), 1)
                .unwrap_or(today),
            calendar_selected: today,
            team_state: TableState::default(),
            detail: None,
            confirm_delete: None,
            prompt: None,
        };
        app.tasks = app.sync.snapshot();
        app.request_profiles();
        app
    }

    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            self.poll_background();
            terminal.draw(|f| self.render(f))?;

            if event::poll(POLL_INTERVAL)? {
                if let Event::Key(key) = event::read()? {
                    if self.handle_key(key.code) {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    /// Pick up completed background work: outcome notices and profile
    /// fetches. Re-snapshot so pending overlays show through.
    fn poll_background(&mut self) {
        for notice in self.sync.drain_notices() {
            self.status_is_error = notice.is_failure();
            self.status_message = match notice {
                Notice::Success(m) | Notice::Failure(m) => m,
            };
        }
        if let Some(profiles) = self.incoming_profiles.lock().take() {
            self.profiles = profiles;
        }
        self.tasks = self.sync.snapshot();
    }

    fn request_refresh(&self) {
        let sync = Arc::clone(&self.sync);
        self.handle.spawn(async move {
            let _ = sync.refresh().await;
        });
        self.request_profiles();
    }

    fn request_profiles(&self) {
        let team = Arc::clone(&self.team);
        let slot = Arc::clone(&self.incoming_profiles);
        self.handle.spawn(async move {
            if let Ok(profiles) = team.list().await {
                *slot.lock() = Some(profiles);
            }
        });
    }

    // -- input -----------------------------------------------------------

    /// Returns true when the application should exit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.prompt.is_some() {
            self.handle_prompt_key(code);
            return false;
        }
        if self.input_mode == InputMode::Search {
            self.handle_search_key(code);
            return false;
        }
        if self.confirm_delete.is_some() {
            self.handle_confirm_key(code);
            return false;
        }
        if self.detail.is_some() {
            self.handle_detail_key(code);
            return false;
        }

        match code {
            KeyCode::Char('q') => return true,
            KeyCode::Tab => self.view = self.view.next(),
            KeyCode::Char('1') => self.view = ViewTab::Kanban,
            KeyCode::Char('2') => self.view = ViewTab::Table,
            KeyCode::Char('3') => self.view = ViewTab::Calendar,
            KeyCode::Char('4') => self.view = ViewTab::Reports,
            KeyCode::Char('5') => self.view = ViewTab::Team,
            KeyCode::Char('/') => self.input_mode = InputMode::Search,
            KeyCode::Char('r') => {
                self.request_refresh();
                self.set_status("refreshing", false);
            }
            _ => match self.view {
                ViewTab::Kanban => self.handle_kanban_key(code),
                ViewTab::Table => self.handle_table_key(code),
                ViewTab::Calendar => self.handle_calendar_key(code),
                ViewTab::Reports => {}
                ViewTab::Team => self.handle_team_key(code),
            },
        }
        false
    }

    fn open_prompt(&mut self, kind: PromptKind, initial: &str) {
        self.prompt = Some(Prompt {
            kind,
            buffer: initial.to_string(),
        });
    }

    fn handle_prompt_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.prompt = None;
                self.set_status("cancelled", false);
            }
            KeyCode::Enter => self.submit_prompt(),
            KeyCode::Backspace => {
                if let Some(p) = self.prompt.as_mut() {
                    p.buffer.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(p) = self.prompt.as_mut() {
                    p.buffer.push(c);
                }
            }
            _ => {}
        }
    }

    /// Act on the entered value: chain to the next field of a
    /// multi-step entry, reopen on invalid input, or spawn the
    /// mutation.
    fn submit_prompt(&mut self) {
        let prompt = match self.prompt.take() {
            Some(p) => p,
            None => return,
        };
        match advance_prompt(prompt.kind, prompt.buffer.trim()) {
            PromptStep::Chain(kind) => self.open_prompt(kind, ""),
            PromptStep::Retry { kind, message } => {
                self.set_status(message, true);
                self.open_prompt(kind, "");
            }
            PromptStep::Submit(action) => self.spawn_prompt_action(action),
        }
    }

    fn spawn_prompt_action(&self, action: PromptAction) {
        let sync = Arc::clone(&self.sync);
        self.handle.spawn(async move {
            let _ = match action {
                PromptAction::CreateTask(new) => sync.create_task(&new).await,
                PromptAction::AddSubTask { task_id, title } => {
                    sync.add_sub_task(&task_id, &title, None).await
                }
                PromptAction::AddComment {
                    task_id,
                    author,
                    content,
                } => sync.add_comment(&task_id, &author, &content).await,
                PromptAction::AssignSubTask {
                    sub_task_id,
                    assignee,
                } => sync.set_sub_task_assignee(&sub_task_id, &assignee).await,
                PromptAction::SaveMemo { sub_task_id, memo } => {
                    sync.set_sub_task_memo(&sub_task_id, &memo).await
                }
            };
        });
    }

    fn handle_search_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.search.clear();
                self.input_mode = InputMode::None;
            }
            KeyCode::Enter => self.input_mode = InputMode::None,
            KeyCode::Backspace => {
                self.search.pop();
            }
            KeyCode::Char(c) => self.search.push(c),
            _ => {}
        }
    }

    fn handle_confirm_key(&mut self, code: KeyCode) {
        let task_id = match self.confirm_delete.take() {
            Some(id) => id,
            None => return,
        };
        if code == KeyCode::Char('y') {
            self.detail = None;
            let sync = Arc::clone(&self.sync);
            self.handle.spawn(async move {
                let _ = sync.delete_task(&task_id).await;
            });
        } else {
            self.set_status("delete cancelled", false);
        }
    }

    fn handle_detail_key(&mut self, code: KeyCode) {
        let (task_id, sub_count) = match self.detail.as_ref().and_then(|d| {
            self.tasks
                .iter()
                .find(|t| t.id == d.task_id)
                .map(|t| (t.id.clone(), t.sub_tasks.len()))
        }) {
            Some(found) => found,
            None => {
                self.detail = None;
                return;
            }
        };

        match code {
            KeyCode::Esc => self.detail = None,
            KeyCode::Up => {
                if let Some(d) = self.detail.as_mut() {
                    d.sub_task_index = d.sub_task_index.saturating_sub(1);
                }
            }
            KeyCode::Down => {
                if let Some(d) = self.detail.as_mut() {
                    if d.sub_task_index + 1 < sub_count {
                        d.sub_task_index += 1;
                    }
                }
            }
            KeyCode::Char(' ') => self.toggle_selected_sub_task(&task_id),
            KeyCode::Char('x') => self.delete_selected_sub_task(&task_id),
            KeyCode::Char('d') => self.confirm_delete = Some(task_id),
            KeyCode::Char('n') => self.open_prompt(PromptKind::SubTaskTitle { task_id }, ""),
            KeyCode::Char('c') => self.open_prompt(PromptKind::CommentAuthor { task_id }, ""),
            KeyCode::Char('a') => {
                if let Some(sub_task_id) = self.selected_sub_task_id(&task_id) {
                    let current = self
                        .sync
                        .sub_task_assignee(&sub_task_id)
                        .flatten()
                        .unwrap_or_default();
                    self.open_prompt(PromptKind::SubTaskAssignee { sub_task_id }, &current);
                }
            }
            KeyCode::Char('m') => {
                if let Some(sub_task_id) = self.selected_sub_task_id(&task_id) {
                    let current = self
                        .sync
                        .sub_task_memo(&sub_task_id)
                        .flatten()
                        .unwrap_or_default();
                    self.open_prompt(PromptKind::SubTaskMemo { sub_task_id }, &current);
                }
            }
            KeyCode::Char('s') => self.cycle_selected_status(&task_id),
            KeyCode::Char('p') => self.cycle_selected_priority(&task_id),
            _ => {}
        }
    }

    fn cycle_selected_status(&mut self, task_id: &str) {
        let current = match self.tasks.iter().find(|t| t.id == task_id) {
            Some(t) => t.status,
            None => return,
        };
        let idx = Status::ALL.iter().position(|s| *s == current).unwrap_or(0);
        let next = Status::ALL[(idx + 1) % Status::ALL.len()];
        self.spawn_task_patch(
            task_id,
            TaskPatch {
                status: Some(next),
                ..TaskPatch::default()
            },
        );
    }

    fn cycle_selected_priority(&mut self, task_id: &str) {
        let current = match self.tasks.iter().find(|t| t.id == task_id) {
            Some(t) => t.priority,
            None => return,
        };
        let next = match current {
            Priority::Low => Priority::Medium,
            Priority::Medium => Priority::High,
            Priority::High => Priority::Low,
        };
        self.spawn_task_patch(
            task_id,
            TaskPatch {
                priority: Some(next),
                ..TaskPatch::default()
            },
        );
    }

    fn spawn_task_patch(&self, task_id: &str, patch: TaskPatch) {
        let sync = Arc::clone(&self.sync);
        let task_id = task_id.to_string();
        self.handle.spawn(async move {
            let _ = sync.update_task(&task_id, &patch).await;
        });
    }

    fn toggle_selected_sub_task(&mut self, task_id: &str) {
        let sub_task_id = match self.selected_sub_task_id(task_id) {
            Some(id) => id,
            None => return,
        };
        let next = !self.sync.sub_task_completed(&sub_task_id).unwrap_or(false);
        let sync = Arc::clone(&self.sync);
        let task_id = task_id.to_string();
        self.handle.spawn(async move {
            let _ = sync.set_sub_task_completed(&task_id, &sub_task_id, next).await;
        });
    }

    fn delete_selected_sub_task(&mut self, task_id: &str) {
        let sub_task_id = match self.selected_sub_task_id(task_id) {
            Some(id) => id,
            None => return,
        };
        let sync = Arc::clone(&self.sync);
        let task_id = task_id.to_string();
        self.handle.spawn(async move {
            let _ = sync.delete_sub_task(&task_id, &sub_task_id).await;
        });
    }

    fn selected_sub_task_id(&self, task_id: &str) -> Option<String> {
        let detail = self.detail.as_ref()?;
        let task = self.tasks.iter().find(|t| t.id == task_id)?;
        task.sub_tasks
            .get(detail.sub_task_index)
            .map(|st| st.id.clone())
    }

    fn handle_kanban_key(&mut self, code: KeyCode) {
        let columns = kanban_columns(&self.tasks, &self.search);
        let (mut col, mut card) = self.kanban_selected;
        match code {
            KeyCode::Left | KeyCode::Char('h') => col = col.saturating_sub(1),
            KeyCode::Right | KeyCode::Char('l') => col = (col + 1).min(3),
            KeyCode::Up | KeyCode::Char('k') => card = card.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => card += 1,
            KeyCode::Enter => {
                if let Some(task) = columns[col].get(card) {
                    self.detail = Some(DetailState {
                        task_id: task.id.clone(),
                        sub_task_index: 0,
                    });
                }
                return;
            }
            KeyCode::Char('d') => {
                if let Some(task) = columns[col].get(card) {
                    self.confirm_delete = Some(task.id.clone());
                }
                return;
            }
            KeyCode::Char('a') => {
                self.open_prompt(PromptKind::NewTaskTitle, "");
                return;
            }
            _ => return,
        }
        let len = columns[col].len();
        if len > 0 {
            card = card.min(len - 1);
        } else {
            card = 0;
        }
        self.kanban_selected = (col, card);
    }

    fn handle_table_key(&mut self, code: KeyCode) {
        let rows = table_rows(&self.tasks, &self.search, self.sort);
        match code {
            KeyCode::Up => {
                let i = self.table_state.selected().unwrap_or(0);
                self.table_state.select(Some(i.saturating_sub(1)));
            }
            KeyCode::Down => {
                let i = self.table_state.selected().map(|i| i + 1).unwrap_or(0);
                if !rows.is_empty() {
                    self.table_state.select(Some(i.min(rows.len() - 1)));
                }
            }
            KeyCode::Char('s') => {
                self.sort = match self.sort {
                    SortKey::Due => SortKey::Priority,
                    SortKey::Priority => SortKey::Created,
                    SortKey::Created => SortKey::Due,
                };
            }
            KeyCode::Enter => {
                if let Some(task) = self.table_state.selected().and_then(|i| rows.get(i)) {
                    self.detail = Some(DetailState {
                        task_id: task.id.clone(),
                        sub_task_index: 0,
                    });
                }
            }
            KeyCode::Char('d') => {
                if let Some(task) = self.table_state.selected().and_then(|i| rows.get(i)) {
                    self.confirm_delete = Some(task.id.clone());
                }
            }
            KeyCode::Char('a') => self.open_prompt(PromptKind::NewTaskTitle, ""),
            _ => {}
        }
    }

    fn handle_calendar_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Left => self.calendar_selected -= chrono::Duration::days(1),
            KeyCode::Right => self.calendar_selected += chrono::Duration::days(1),
            KeyCode::Up => self.calendar_selected -= chrono::Duration::days(7),
            KeyCode::Down => self.calendar_selected += chrono::Duration::days(7),
            KeyCode::Char('p') => self.calendar_anchor = previous_month(self.calendar_anchor),
            KeyCode::Char('n') => self.calendar_anchor = next_month(self.calendar_anchor),
            _ => return,
        }
        // Follow the selection across month boundaries.
        if self.calendar_selected.month() != self.calendar_anchor.month()
            || self.calendar_selected.year() != self.calendar_anchor.year()
        {
            if let Some(first) = NaiveDate::from_ymd_opt(
                self.calendar_selected.year(),
                self.calendar_selected.month(),
                1,
            ) {
                self.calendar_anchor = first;
            }
        }
    }

    fn handle_team_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Up => {
                let i = self.team_state.selected().unwrap_or(0);
                self.team_state.select(Some(i.saturating_sub(1)));
            }
            KeyCode::Down => {
                let i = self.team_state.selected().map(|i| i + 1).unwrap_or(0);
                if !self.profiles.is_empty() {
                    self.team_state.select(Some(i.min(self.profiles.len() - 1)));
                }
            }
            _ => {}
        }
    }

    fn set_status(&mut self, message: &str, is_error: bool) {
        self.status_message = message.to_string();
        self.status_is_error = is_error;
    }

    // -- rendering -------------------------------------------------------

    fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(5),
                Constraint::Length(1),
            ])
            .split(f.area());

        self.render_tab_bar(f, chunks[0]);
        match self.view {
            ViewTab::Kanban => {
                let columns = kanban_columns(&self.tasks, &self.search);
                render_kanban(f, chunks[1], &columns, self.kanban_selected);
            }
            ViewTab::Table => {
                let rows = table_rows(&self.tasks, &self.search, self.sort);
                let total = self.tasks.len();
                render_table(f, chunks[1], &rows, &mut self.table_state, total);
            }
            ViewTab::Calendar => render_calendar(
                f,
                chunks[1],
                &self.tasks,
                self.calendar_anchor,
                self.calendar_selected,
            ),
            ViewTab::Reports => render_reports(f, chunks[1], &self.tasks),
            ViewTab::Team => render_team(
                f,
                chunks[1],
                &self.profiles,
                &self.tasks,
                &mut self.team_state,
            ),
        }
        self.render_status_bar(f, chunks[2]);

        if self.detail.is_some() {
            self.render_detail(f);
        }
        if self.confirm_delete.is_some() {
            self.render_confirm(f);
        }
    }

    fn render_tab_bar(&self, f: &mut Frame, area: Rect) {
        let mut spans = Vec::new();
        for (i, tab) in ViewTab::ALL.iter().enumerate() {
            let style = if *tab == self.view {
                Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED)
            } else {
                Style::default()
            };
            spans.push(Span::styled(format!(" {} {} ", i + 1, tab.title()), style));
            spans.push(Span::raw(" "));
        }
        if !self.search.is_empty() || self.input_mode == InputMode::Search {
            spans.push(Span::styled(
                format!("  /{}", self.search),
                Style::default().fg(Color::Yellow),
            ));
        }
        f.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let (text, style) = if let Some(prompt) = &self.prompt {
            (
                format!(
                    "{}: {}_ (Enter to save, Esc to cancel)",
                    prompt.label(),
                    prompt.buffer
                ),
                Style::default().fg(Color::Yellow),
            )
        } else if self.input_mode == InputMode::Search {
            (
                format!("search: {}_ (Enter to apply, Esc to clear)", self.search),
                Style::default().fg(Color::Yellow),
            )
        } else if !self.status_message.is_empty() {
            let style = if self.status_is_error {
                Style::default().fg(Color::Red)
            } else {
                Style::default().fg(Color::Green)
            };
            (self.status_message.clone(), style)
        } else {
            (
                "q quit | Tab/1-5 views | / search | r refresh | a add task | Enter details | d delete"
                    .into(),
                Style::default().fg(Color::DarkGray),
            )
        };
        f.render_widget(Paragraph::new(Span::styled(text, style)), area);
    }

    fn render_detail(&self, f: &mut Frame) {
        let detail = match self.detail.as_ref() {
            Some(d) => d,
            None => return,
        };
        let task = match self.tasks.iter().find(|t| t.id == detail.task_id) {
            Some(t) => t,
            None => return,
        };

        let area = centered_rect(70, 80, f.area());
        f.render_widget(Clear, area);

        let mut lines = vec![
            Line::from(vec![
                Span::styled(
                    format_status(task.status),
                    Style::default().fg(status_color(task.status)),
                ),
                Span::raw(format!(
                    "  {} priority  {}  due {}  {}%",
                    format_priority(task.priority),
                    task.assignee_label(),
                    task.due.format("%Y-%m-%d"),
                    task.display_progress()
                )),
            ]),
            Line::from(""),
        ];
        if !task.description.is_empty() {
            lines.push(Line::from(task.description.clone()));
            lines.push(Line::from(""));
        }
        if !task.tags.is_empty() {
            lines.push(Line::from(Span::styled(
                format!("tags: {}", task.tags.join(", ")),
                Style::default().fg(Color::DarkGray),
            )));
            lines.push(Line::from(""));
        }

        lines.push(Line::from(Span::styled(
            format!("Sub-tasks ({})", task.sub_tasks.len()),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for (i, st) in task.sub_tasks.iter().enumerate() {
            let completed = self.sync.sub_task_completed(&st.id).unwrap_or(st.completed);
            let marker = if completed { "[x]" } else { "[ ]" };
            let style = if i == detail.sub_task_index {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            let assignee = self
                .sync
                .sub_task_assignee(&st.id)
                .unwrap_or_else(|| st.assignee.clone());
            let mut text = format!("{marker} {}", st.title);
            if let Some(name) = assignee {
                text.push_str(&format!(" ({name})"));
            }
            lines.push(Line::from(Span::styled(text, style)));
            let memo = self.sync.sub_task_memo(&st.id).unwrap_or_else(|| st.memo.clone());
            if let Some(memo) = memo {
                lines.push(Line::from(Span::styled(
                    format!("      {}", truncate(&memo, 60)),
                    Style::default().fg(Color::DarkGray),
                )));
            }
        }

        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("Comments ({})", task.comments.len()),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for comment in &task.comments {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("{}: ", comment.author_label()),
                    Style::default().fg(Color::Cyan),
                ),
                Span::raw(comment.content.clone()),
            ]));
        }

        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Space toggle | n sub-task | a assign | m memo | x remove | c comment | s status | p priority | d delete | Esc close",
            Style::default().fg(Color::DarkGray),
        )));

        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", truncate(&task.title, 50)));
        f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }).block(block), area);
    }

    fn render_confirm(&self, f: &mut Frame) {
        let title = self
            .confirm_delete
            .as_deref()
            .and_then(|id| self.tasks.iter().find(|t| t.id == id))
            .map(|t| t.title.clone())
            .unwrap_or_default();
        let area = centered_rect(50, 20, f.area());
        f.render_widget(Clear, area);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .title(" Confirm delete ");
        let lines = vec![
            Line::from(format!("Delete task '{}'?", truncate(&title, 40))),
            Line::from("Sub-tasks and comments go with it."),
            Line::from(""),
            Line::from(Span::styled(
                "y to delete, any other key to cancel",
                Style::default().add_modifier(Modifier::BOLD),
            )),
        ];
        f.render_widget(Paragraph::new(lines).block(block), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn new_task_prompts_chain_into_a_validated_create() {
        let kind = match advance_prompt(PromptKind::NewTaskTitle, "Spec review") {
            PromptStep::Chain(k) => k,
            _ => panic!("title should chain to the assignee prompt"),
        };
        let kind = match advance_prompt(kind, "Kim") {
            PromptStep::Chain(k) => k,
            _ => panic!("assignee should chain to the due prompt"),
        };
        match advance_prompt(kind, "tomorrow") {
            PromptStep::Submit(PromptAction::CreateTask(new)) => {
                assert_eq!(new.title, "Spec review");
                assert_eq!(new.assignee, "Kim");
                assert_eq!(new.due, today() + Duration::days(1));
                assert_eq!(new.status, Status::Todo);
                assert_eq!(new.progress, 0);
                assert!(new.validate().is_ok());
            }
            _ => panic!("due date should complete the create"),
        }
    }

    #[test]
    fn empty_required_fields_reopen_the_prompt() {
        assert!(matches!(
            advance_prompt(PromptKind::NewTaskTitle, ""),
            PromptStep::Retry {
                kind: PromptKind::NewTaskTitle,
                ..
            }
        ));
        assert!(matches!(
            advance_prompt(
                PromptKind::SubTaskAssignee {
                    sub_task_id: "s1".into()
                },
                ""
            ),
            PromptStep::Retry {
                kind: PromptKind::SubTaskAssignee { .. },
                ..
            }
        ));
    }

    #[test]
    fn unparsable_due_date_reopens_the_prompt() {
        assert!(matches!(
            advance_prompt(
                PromptKind::NewTaskDue {
                    title: "t".into(),
                    assignee: "Kim".into()
                },
                "next week"
            ),
            PromptStep::Retry {
                kind: PromptKind::NewTaskDue { .. },
                ..
            }
        ));
    }

    #[test]
    fn comment_prompts_carry_author_and_content() {
        let kind = match advance_prompt(
            PromptKind::CommentAuthor {
                task_id: "t1".into(),
            },
            "Lee",
        ) {
            PromptStep::Chain(k) => k,
            _ => panic!("author should chain to the content prompt"),
        };
        match advance_prompt(kind, "looks good") {
            PromptStep::Submit(PromptAction::AddComment {
                task_id,
                author,
                content,
            }) => {
                assert_eq!(task_id, "t1");
                assert_eq!(author, "Lee");
                assert_eq!(content, "looks good");
            }
            _ => panic!("content should complete the comment"),
        }
    }

    #[test]
    fn memo_prompt_accepts_empty_text() {
        match advance_prompt(
            PromptKind::SubTaskMemo {
                sub_task_id: "s1".into(),
            },
            "",
        ) {
            PromptStep::Submit(PromptAction::SaveMemo { sub_task_id, memo }) => {
                assert_eq!(sub_task_id, "s1");
                assert!(memo.is_empty());
            }
            _ => panic!("memo should submit even when cleared"),
        }
    }
}
