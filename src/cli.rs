use clap::Parser;

use crate::cmd::Commands;

/// Team task board CLI. Talks to the team's hosted data store;
/// connection settings come from TEAMBOARD_URL/TEAMBOARD_API_KEY or
/// `tb init`.
#[derive(Parser)]
#[command(name = "tb", version, about = "Team task board CLI and dashboard")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}
