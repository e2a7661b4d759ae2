//! Command implementations for the CLI interface.
//!
//! Each handler builds on the repository and team directory; the `ui`
//! command hands over to the terminal dashboard, which layers the
//! optimistic synchronisation hub on top.

use std::io;
use std::sync::Arc;

use clap::{CommandFactory, Subcommand};
use clap_complete::{generate, Shell};

use chrono::{Duration, NaiveDate};

use crate::cli::Cli;
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::fields::*;
use crate::http::HttpStore;
use crate::repo::{NewTask, TaskRepository};
use crate::sync::TaskSync;
use crate::task::{
    format_due_relative, split_and_normalise_tags, start_end_of_this_week, today, truncate,
    SubTask, Task, UNASSIGNED,
};
use crate::team::TeamDirectory;
use crate::tui::run::run_dashboard;

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the interactive dashboard.
    Ui,

    /// List tasks with optional filters.
    List {
        /// Filter by status.
        #[arg(long, value_enum)]
        status: Option<Status>,
        /// Filter by priority.
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        /// Filter by assignee display name, or "unassigned".
        #[arg(long)]
        assignee: Option<String>,
        /// Filter by tag. May be repeated. Accepts comma-separated.
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Due filter: today | this-week | overdue.
        #[arg(long, value_enum)]
        due: Option<DueFilter>,
        /// Sort key.
        #[arg(long, value_enum, default_value_t = SortKey::Due)]
        sort: SortKey,
        /// Limit number of rows printed.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// View a single task by ID or title.
    View {
        /// Task ID or title.
        id: String,
    },

    /// Add a new task.
    Add {
        /// Short title for the task.
        title: String,
        /// Optional longer description.
        #[arg(long)]
        desc: Option<String>,
        /// Assignee display name. Required.
        #[arg(long)]
        assignee: String,
        /// Due date: YYYY-MM-DD, "today", "tomorrow", or "in Nd".
        #[arg(long, default_value = "today")]
        due: String,
        /// Status: todo | in-progress | delayed | completed.
        #[arg(long, value_enum, default_value_t = Status::Todo)]
        status: Status,
        /// Priority: low | medium | high.
        #[arg(long, value_enum, default_value_t = Priority::Medium)]
        priority: Priority,
        /// Initial progress percentage (only meaningful without sub-tasks).
        #[arg(long, default_value_t = 0)]
        progress: u8,
        /// Comma-separated tags. May be repeated.
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Update fields on a task.
    Update {
        /// Task ID or title.
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        desc: Option<String>,
        #[arg(long, value_enum)]
        status: Option<Status>,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        /// Reassign to another team member.
        #[arg(long)]
        assignee: Option<String>,
        /// New due date: YYYY-MM-DD, "today", "tomorrow", or "in Nd".
        #[arg(long)]
        due: Option<String>,
        /// Stored progress percentage.
        #[arg(long)]
        progress: Option<u8>,
        /// Replace the tag set. May be repeated and comma-separated.
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Delete a task with its sub-tasks and comments.
    Delete {
        /// Task ID or title.
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },

    /// Add a comment to a task.
    Comment {
        /// Task ID or title.
        id: String,
        /// Comment text.
        content: String,
        /// Author display name.
        #[arg(long)]
        author: String,
    },

    /// Manage sub-tasks of a task.
    Subtask {
        #[command(subcommand)]
        action: SubtaskAction,
    },

    /// Manage team members.
    Team {
        #[command(subcommand)]
        action: TeamAction,
    },

    /// Store the remote store URL and API key.
    Init {
        /// Base URL of the hosted store.
        url: String,
        /// API key (sent as both apikey header and bearer token).
        api_key: String,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum SubtaskAction {
    /// Add a sub-task under a task.
    Add {
        /// Parent task ID or title.
        task: String,
        /// Sub-task title.
        title: String,
        /// Assignee display name.
        #[arg(long)]
        assignee: Option<String>,
    },
    /// Mark a sub-task complete.
    Done {
        /// Parent task ID or title.
        task: String,
        /// Sub-task ID or title.
        sub: String,
    },
    /// Mark a sub-task incomplete again.
    Reopen {
        /// Parent task ID or title.
        task: String,
        /// Sub-task ID or title.
        sub: String,
    },
    /// Reassign a sub-task.
    Assign {
        /// Parent task ID or title.
        task: String,
        /// Sub-task ID or title.
        sub: String,
        /// New assignee display name.
        assignee: String,
    },
    /// Set or replace a sub-task memo.
    Memo {
        /// Parent task ID or title.
        task: String,
        /// Sub-task ID or title.
        sub: String,
        /// Memo text.
        memo: String,
    },
    /// Delete a sub-task.
    Rm {
        /// Parent task ID or title.
        task: String,
        /// Sub-task ID or title.
        sub: String,
    },
}

#[derive(Subcommand)]
pub enum TeamAction {
    /// List team members.
    List,
    /// Register a new member. Admin only.
    Add {
        /// Display name.
        name: String,
        /// Role: user | manager | admin.
        #[arg(long, value_enum, default_value_t = Role::User)]
        role: Role,
        /// Phone number.
        #[arg(long)]
        phone: Option<String>,
        /// Acting member's display name (must hold the admin role).
        #[arg(long)]
        actor: String,
    },
    /// Change a member's role. Admin only.
    Role {
        /// Member display name.
        name: String,
        /// New role.
        #[arg(value_enum)]
        role: Role,
        /// Acting member's display name.
        #[arg(long)]
        actor: String,
    },
    /// Remove a member completely: unassign their work, delete their
    /// comments, then delete the profile and account. Admin only.
    Remove {
        /// Member display name.
        name: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
        /// Acting member's display name.
        #[arg(long)]
        actor: String,
    },
    /// Reset a member's password through the admin endpoint. Admin only.
    ResetPassword {
        /// Member display name.
        name: String,
        /// New password (at least 6 characters).
        password: String,
        /// Acting member's display name.
        #[arg(long)]
        actor: String,
    },
}

/// Parse a due date argument: YYYY-MM-DD, "today", "tomorrow", or
/// "in Nd".
pub fn parse_due(input: &str) -> Result<NaiveDate> {
    let today = today();
    match input {
        "today" => return Ok(today),
        "tomorrow" => return Ok(today + Duration::days(1)),
        _ => {}
    }
    if let Some(days) = input
        .strip_prefix("in ")
        .and_then(|rest| rest.strip_suffix('d'))
        .and_then(|n| n.parse::<i64>().ok())
    {
        return Ok(today + Duration::days(days));
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|_| {
        Error::Validation(format!(
            "unrecognised due date '{input}'; use YYYY-MM-DD, 'today', 'tomorrow', or 'in Nd'"
        ))
    })
}

/// Find a task by exact ID, falling back to exact title.
fn find_task<'a>(tasks: &'a [Task], key: &str) -> Result<&'a Task> {
    tasks
        .iter()
        .find(|t| t.id == key)
        .or_else(|| tasks.iter().find(|t| t.title == key))
        .ok_or_else(|| Error::Validation(format!("no task matching '{key}'")))
}

/// Find a sub-task within a task by exact ID, falling back to title.
fn find_sub_task<'a>(task: &'a Task, key: &str) -> Result<&'a SubTask> {
    task.sub_tasks
        .iter()
        .find(|st| st.id == key)
        .or_else(|| task.sub_tasks.iter().find(|st| st.title == key))
        .ok_or_else(|| {
            Error::Validation(format!("no sub-task matching '{key}' on '{}'", task.title))
        })
}

fn print_task_table(tasks: &[&Task]) {
    let today = today();
    println!(
        "{:<34} {:<12} {:<8} {:<14} {:<10} {:>4}  {}",
        "Title", "Status", "Priority", "Assignee", "Due", "%", "Tags"
    );
    for task in tasks {
        println!(
            "{:<34} {:<12} {:<8} {:<14} {:<10} {:>4}  {}",
            truncate(&task.title, 33),
            format_status(task.status),
            format_priority(task.priority),
            truncate(task.assignee_label(), 13),
            format_due_relative(task.due, today),
            format!("{}%", task.display_progress()),
            task.tags.join(",")
        );
    }
    println!("{} task(s)", tasks.len());
}

/// Launch the terminal dashboard.
pub async fn cmd_ui(store: HttpStore) -> Result<()> {
    let sync = Arc::new(TaskSync::new(TaskRepository::new(store.clone())));
    sync.refresh().await?;
    let team = Arc::new(TeamDirectory::new(store));
    let handle = tokio::runtime::Handle::current();
    tokio::task::block_in_place(|| run_dashboard(sync, team, handle))?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn cmd_list(
    repo: &TaskRepository<HttpStore>,
    status: Option<Status>,
    priority: Option<Priority>,
    assignee: Option<String>,
    tags: Vec<String>,
    due: Option<DueFilter>,
    sort: SortKey,
    limit: Option<usize>,
) -> Result<()> {
    let tags = split_and_normalise_tags(&tags);
    let today = today();
    let (week_start, week_end) = start_end_of_this_week(today);

    let tasks = repo.list_all().await?;
    let mut filtered: Vec<&Task> = tasks
        .iter()
        .filter(|t| {
            if let Some(s) = status {
                if t.status != s {
                    return false;
                }
            }
            if let Some(p) = priority {
                if t.priority != p {
                    return false;
                }
            }
            if let Some(ref a) = assignee {
                if t.assignee_label() != a.as_str()
                    && !(a.as_str() == UNASSIGNED && t.assignee.is_none())
                {
                    return false;
                }
            }
            if !tags.is_empty() && !tags.iter().all(|tag| t.tags.contains(tag)) {
                return false;
            }
            if let Some(df) = due {
                match df {
                    DueFilter::Today => {
                        if t.due != today {
                            return false;
                        }
                    }
                    DueFilter::ThisWeek => {
                        if t.due < week_start || t.due > week_end {
                            return false;
                        }
                    }
                    DueFilter::Overdue => {
                        if t.due >= today {
                            return false;
                        }
                    }
                }
            }
            true
        })
        .collect();

    match sort {
        SortKey::Due => filtered.sort_by_key(|t| t.due),
        SortKey::Priority => filtered.sort_by(|a, b| b.priority.cmp(&a.priority)),
        SortKey::Created => filtered.sort_by_key(|t| t.created_at),
    }
    if let Some(n) = limit {
        filtered.truncate(n);
    }

    print_task_table(&filtered);
    Ok(())
}

pub async fn cmd_view(repo: &TaskRepository<HttpStore>, id: String) -> Result<()> {
    let tasks = repo.list_all().await?;
    let task = find_task(&tasks, &id)?;
    let today = today();

    println!("ID:          {}", task.id);
    println!("Title:       {}", task.title);
    println!("Status:      {}", format_status(task.status));
    println!("Priority:    {}", format_priority(task.priority));
    println!("Assignee:    {}", task.assignee_label());
    println!(
        "Due:         {} ({})",
        task.due,
        format_due_relative(task.due, today)
    );
    println!("Progress:    {}%", task.display_progress());
    println!(
        "Tags:        {}",
        if task.tags.is_empty() {
            "-".into()
        } else {
            task.tags.join(",")
        }
    );
    println!("Created:     {}", task.created_at.to_rfc3339());
    if !task.description.is_empty() {
        println!("Description:\n{}", task.description);
    }

    println!("\nSub-tasks ({}):", task.sub_tasks.len());
    for st in &task.sub_tasks {
        let marker = if st.completed { "[x]" } else { "[ ]" };
        let assignee = st.assignee.as_deref().unwrap_or(UNASSIGNED);
        print!("  {marker} {} ({assignee})", st.title);
        match &st.memo {
            Some(memo) => println!(" :: {memo}"),
            None => println!(),
        }
    }

    println!("\nComments ({}):", task.comments.len());
    for comment in &task.comments {
        println!(
            "  {} [{}]: {}",
            comment.author_label(),
            comment.created_at.format("%Y-%m-%d %H:%M"),
            comment.content
        );
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn cmd_add(
    repo: &TaskRepository<HttpStore>,
    title: String,
    desc: Option<String>,
    assignee: String,
    due: String,
    status: Status,
    priority: Priority,
    progress: u8,
    tags: Vec<String>,
) -> Result<()> {
    let new = NewTask {
        title,
        description: desc.unwrap_or_default(),
        status,
        priority,
        assignee,
        due: parse_due(&due)?,
        progress: progress.min(100),
        tags: split_and_normalise_tags(&tags),
    };
    new.validate()?;
    let task = repo.create_task(&new).await?;
    println!("Added task {} '{}'", task.id, task.title);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn cmd_update(
    repo: &TaskRepository<HttpStore>,
    id: String,
    title: Option<String>,
    desc: Option<String>,
    status: Option<Status>,
    priority: Option<Priority>,
    assignee: Option<String>,
    due: Option<String>,
    progress: Option<u8>,
    tags: Vec<String>,
) -> Result<()> {
    let tasks = repo.list_all().await?;
    let task_id = find_task(&tasks, &id)?.id.clone();

    let assignee_id = match assignee {
        Some(name) => Some(repo.resolve_assignee(&name).await?),
        None => None,
    };
    let patch = crate::store::TaskPatch {
        title,
        description: desc,
        status,
        priority,
        assignee_id,
        due_date: due.as_deref().map(parse_due).transpose()?,
        progress: progress.map(|p| p.min(100)),
        tags: if tags.is_empty() {
            None
        } else {
            Some(split_and_normalise_tags(&tags))
        },
    };
    repo.update_task(&task_id, &patch).await?;
    println!("Updated task {task_id}");
    Ok(())
}

pub async fn cmd_delete(repo: &TaskRepository<HttpStore>, id: String, yes: bool) -> Result<()> {
    let tasks = repo.list_all().await?;
    let task = find_task(&tasks, &id)?;
    if !yes {
        return Err(Error::Validation(format!(
            "deleting '{}' removes {} sub-task(s) and {} comment(s); pass --yes to confirm",
            task.title,
            task.sub_tasks.len(),
            task.comments.len()
        )));
    }
    let task_id = task.id.clone();
    let title = task.title.clone();
    repo.delete_task(&task_id).await?;
    println!("Deleted task '{title}'");
    Ok(())
}

pub async fn cmd_comment(
    repo: &TaskRepository<HttpStore>,
    id: String,
    content: String,
    author: String,
) -> Result<()> {
    let tasks = repo.list_all().await?;
    let task_id = find_task(&tasks, &id)?.id.clone();
    repo.add_comment(&task_id, &author, &content).await?;
    println!("Comment added");
    Ok(())
}

pub async fn cmd_subtask(repo: &TaskRepository<HttpStore>, action: SubtaskAction) -> Result<()> {
    let tasks = repo.list_all().await?;
    match action {
        SubtaskAction::Add {
            task,
            title,
            assignee,
        } => {
            let parent = find_task(&tasks, &task)?;
            let st = repo
                .add_sub_task(&parent.id, &title, assignee.as_deref())
                .await?;
            println!("Added sub-task {} '{}'", st.id, st.title);
        }
        SubtaskAction::Done { task, sub } => {
            let parent = find_task(&tasks, &task)?;
            let st = find_sub_task(parent, &sub)?;
            repo.update_sub_task_completion(&parent.id, &st.id, true).await?;
            println!("Completed sub-task '{}'", st.title);
        }
        SubtaskAction::Reopen { task, sub } => {
            let parent = find_task(&tasks, &task)?;
            let st = find_sub_task(parent, &sub)?;
            repo.update_sub_task_completion(&parent.id, &st.id, false).await?;
            println!("Reopened sub-task '{}'", st.title);
        }
        SubtaskAction::Rm { task, sub } => {
            let parent = find_task(&tasks, &task)?;
            let st = find_sub_task(parent, &sub)?;
            repo.delete_sub_task(&st.id).await?;
            println!("Deleted sub-task '{}'", st.title);
        }
        SubtaskAction::Assign {
            task,
            sub,
            assignee,
        } => {
            let parent = find_task(&tasks, &task)?;
            let st = find_sub_task(parent, &sub)?;
            repo.update_sub_task_assignee(&st.id, &assignee).await?;
            println!("Assigned '{}' to {assignee}", st.title);
        }
        SubtaskAction::Memo { task, sub, memo } => {
            let parent = find_task(&tasks, &task)?;
            let st = find_sub_task(parent, &sub)?;
            repo.update_sub_task_memo(&st.id, &memo).await?;
            println!("Memo saved on '{}'", st.title);
        }
    }
    Ok(())
}

pub async fn cmd_team(
    team: &TeamDirectory<HttpStore>,
    repo: &TaskRepository<HttpStore>,
    action: TeamAction,
) -> Result<()> {
    match action {
        TeamAction::List => {
            let profiles = team.list().await?;
            println!("{:<20} {:<9} {:<14} {}", "Name", "Role", "Phone", "Joined");
            for p in &profiles {
                println!(
                    "{:<20} {:<9} {:<14} {}",
                    truncate(&p.name, 19),
                    format_role(p.role),
                    p.phone.as_deref().unwrap_or("-"),
                    p.created_at.format("%Y-%m-%d")
                );
            }
            println!("{} member(s)", profiles.len());
        }
        TeamAction::Add {
            name,
            role,
            phone,
            actor,
        } => {
            let acting = team.find_by_name(&actor).await?;
            let profile = team
                .register(&acting, &name, role, phone.as_deref())
                .await?;
            println!("Registered {} ({})", profile.name, format_role(profile.role));
        }
        TeamAction::Role { name, role, actor } => {
            let acting = team.find_by_name(&actor).await?;
            let member = team.find_by_name(&name).await?;
            team.set_role(&acting, &member.id, role).await?;
            println!("{} is now {}", member.name, format_role(role));
        }
        TeamAction::Remove { name, yes, actor } => {
            let acting = team.find_by_name(&actor).await?;
            let member = team.find_by_name(&name).await?;
            if !yes {
                let assigned = repo
                    .list_all()
                    .await?
                    .iter()
                    .filter(|t| t.assignee.as_deref() == Some(member.name.as_str()))
                    .count();
                return Err(Error::Validation(format!(
                    "removing '{}' unassigns {assigned} task(s) and deletes their comments \
                     and account; pass --yes to confirm",
                    member.name
                )));
            }
            let outcome = team.remove(&acting, &member).await?;
            if let Some(message) = outcome.message {
                println!("{message}");
            } else {
                println!("Removed {}", member.name);
            }
        }
        TeamAction::ResetPassword {
            name,
            password,
            actor,
        } => {
            let acting = team.find_by_name(&actor).await?;
            let member = team.find_by_name(&name).await?;
            let outcome = team.reset_password(&acting, &member.id, &password).await?;
            println!(
                "{}",
                outcome
                    .message
                    .unwrap_or_else(|| format!("Password reset for {}", member.name))
            );
        }
    }
    Ok(())
}

pub fn cmd_init(url: String, api_key: String) -> Result<()> {
    let cfg = StoreConfig::new(&url, &api_key);
    let path = cfg.save()?;
    println!("Wrote {}", path.display());
    Ok(())
}

pub fn cmd_completions(shell: Shell) {
    generate(shell, &mut Cli::command(), "tb", &mut io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_shorthands_resolve_relative_to_today() {
        let today = today();
        assert_eq!(parse_due("today").unwrap(), today);
        assert_eq!(parse_due("tomorrow").unwrap(), today + Duration::days(1));
        assert_eq!(parse_due("in 5d").unwrap(), today + Duration::days(5));
        assert_eq!(
            parse_due("2024-06-15").unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
        );
        assert!(parse_due("next week").is_err());
    }
}
