//! # tb - Team task board
//!
//! A command-line client and terminal dashboard for a team's hosted
//! task board. Tasks carry sub-task checklists, comments, tags and
//! assignees; the data lives in a hosted relational store shared by the
//! whole team.
//!
//! ## Quick start
//!
//! ```bash
//! # Point tb at the team's hosted store
//! tb init https://example.supabase.co <api-key>
//!
//! # Launch the dashboard (kanban, table, calendar, reports, team)
//! tb ui
//!
//! # Add a task via CLI
//! tb add "Draft launch plan" --assignee Kim --due "in 3d" --tag launch
//!
//! # List open work for this week
//! tb list --due this-week --sort priority
//! ```
//!
//! ## Key commands
//!
//! - `tb ui` - interactive dashboard with optimistic updates
//! - `tb list` / `tb view` - query tasks with filters
//! - `tb add` / `tb update` / `tb delete` - task CRUD
//! - `tb subtask ...` / `tb comment` - checklist items and discussion
//! - `tb team ...` - member administration (admin role required)
//!
//! Connection settings come from `TEAMBOARD_URL`/`TEAMBOARD_API_KEY`
//! or the config file written by `tb init`.

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod fields;
pub mod http;
pub mod repo;
pub mod store;
pub mod sync;
pub mod task;
pub mod team;
pub mod tui {
    pub mod app;
    pub mod calendar;
    pub mod colors;
    pub mod enums;
    pub mod kanban;
    pub mod reports;
    pub mod run;
    pub mod table;
    pub mod team;
    pub mod utils;
}

#[cfg(test)]
mod memory;

use cli::Cli;
use cmd::Commands;
use config::StoreConfig;
use http::HttpStore;
use repo::TaskRepository;
use team::TeamDirectory;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Commands that work without a configured store.
    let command = match cli.command {
        Commands::Init { url, api_key } => {
            if let Err(e) = cmd::cmd_init(url, api_key) {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
            return;
        }
        Commands::Completions { shell } => {
            cmd::cmd_completions(shell);
            return;
        }
        other => other,
    };

    let cfg = match StoreConfig::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    let store = HttpStore::new(&cfg);
    let repo = TaskRepository::new(store.clone());
    let team = TeamDirectory::new(store.clone());

    let outcome = match command {
        Commands::Ui => cmd::cmd_ui(store).await,

        Commands::List {
            status,
            priority,
            assignee,
            tags,
            due,
            sort,
            limit,
        } => cmd::cmd_list(&repo, status, priority, assignee, tags, due, sort, limit).await,

        Commands::View { id } => cmd::cmd_view(&repo, id).await,

        Commands::Add {
            title,
            desc,
            assignee,
            due,
            status,
            priority,
            progress,
            tags,
        } => cmd::cmd_add(&repo, title, desc, assignee, due, status, priority, progress, tags).await,

        Commands::Update {
            id,
            title,
            desc,
            status,
            priority,
            assignee,
            due,
            progress,
            tags,
        } => {
            cmd::cmd_update(&repo, id, title, desc, status, priority, assignee, due, progress, tags)
                .await
        }

        Commands::Delete { id, yes } => cmd::cmd_delete(&repo, id, yes).await,

        Commands::Comment { id, content, author } => {
            cmd::cmd_comment(&repo, id, content, author).await
        }

        Commands::Subtask { action } => cmd::cmd_subtask(&repo, action).await,

        Commands::Team { action } => cmd::cmd_team(&team, &repo, action).await,

        Commands::Init { .. } | Commands::Completions { .. } => unreachable!("handled above"),
    };

    if let Err(e) = outcome {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
