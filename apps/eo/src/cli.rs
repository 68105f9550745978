use std::net::SocketAddr;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "eo")]
#[command(about = "Query and drive an EGTA Online server")]
pub struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Overrides for the `EGTA_*` settings.
#[derive(Args, Debug, Default)]
pub struct ConnectionArgs {
    /// API token
    #[arg(long, global = true, env = "EGTA_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,

    /// Server domain, served over https
    #[arg(long, global = true)]
    pub domain: Option<String>,

    /// Full site root, e.g. http://127.0.0.1:8080/ for a local mock
    #[arg(long, global = true, conflicts_with = "domain")]
    pub base_url: Option<String>,

    /// Retries after the first attempt
    #[arg(long, global = true)]
    pub retries: Option<u32>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Simulators
    #[command(subcommand)]
    Sim(SimCommand),
    /// Generic schedulers
    #[command(subcommand)]
    Sched(SchedCommand),
    /// Games
    #[command(subcommand)]
    Game(GameCommand),
    /// Profiles
    #[command(subcommand)]
    Profile(ProfileCommand),
    /// Simulation runs, most recent first
    Simulations {
        /// Show a single simulation folder instead of the listing
        #[arg(long)]
        folder: Option<u64>,

        /// First page to list
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Sort ascending
        #[arg(long)]
        asc: bool,

        /// state, profile, simulator, folder or job
        #[arg(long, default_value = "job")]
        column: String,

        /// Stop after this many rows
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Serve an in-memory mock of the service
    Mock {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:8080")]
        listen: SocketAddr,

        /// Seed a simulator, as NAME:VERSION; repeatable
        #[arg(long = "simulator")]
        simulators: Vec<String>,

        /// Require this auth token on every request
        #[arg(long)]
        require_token: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum SimCommand {
    /// List all simulators
    List,
    /// Show one simulator
    Info {
        id: u64,
    },
    /// Look a simulator up by name
    Find {
        name: String,
        #[arg(long)]
        version: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum SchedCommand {
    /// List generic schedulers
    List,
    /// Show one scheduler
    Info {
        id: u64,
    },
    /// Show a scheduler's profile requirements
    Requirements {
        id: u64,
    },
    Activate {
        id: u64,
    },
    Deactivate {
        id: u64,
    },
}

#[derive(Subcommand, Debug)]
pub enum GameCommand {
    /// List games, optionally a single page
    List {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long, default_value_t = 25)]
        per_page: u32,
        /// id, name, size or created_at
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        desc: bool,
    },
    /// Show a game
    Info {
        id: u64,
        /// structure, summary, observations or full
        #[arg(short, long, default_value = "structure")]
        granularity: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    /// Show a profile
    Info {
        id: u64,
        /// structure, summary, observations or full
        #[arg(short, long, default_value = "structure")]
        granularity: String,
    },
}
