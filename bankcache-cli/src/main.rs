//! Bankcache CLI - cached bank data from Teller

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;
mod server;

use commands::{accounts, balance, demo, enroll, refresh, remove, serve, status, transactions};

/// Bankcache - a local cache of bank accounts, balances and transactions
#[derive(Parser)]
#[command(name = "bankcache", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll a user and prime the cache from the provider
    Enroll {
        /// Provider user id
        #[arg(long)]
        user_id: String,
        /// Access token from Teller Connect
        #[arg(long, env = "TELLER_ACCESS_TOKEN", hide_env_values = true)]
        token: String,
        /// Display name for the user
        #[arg(long)]
        name: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List cached accounts of a user
    Accounts {
        /// Provider user id
        user_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the balance of an account
    Balance {
        account_id: String,
        /// Fetch from the provider and update the cache first
        #[arg(long)]
        live: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the transactions of an account
    Transactions {
        account_id: String,
        /// Fetch from the provider and update the cache first
        #[arg(long)]
        live: bool,
        /// Rows to show from the cache (defaults to the display limit)
        #[arg(long)]
        limit: Option<usize>,
        /// Transactions to request from the provider with --live
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u16).range(1..=100))]
        count: u16,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Refresh balances and transactions of several accounts in parallel
    Refresh {
        /// Account ids to refresh
        #[arg(required = true)]
        account_ids: Vec<String>,
        /// Transactions to request per account
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u16).range(1..=100))]
        count: u16,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show what the cache holds
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove an account and everything cached for it
    Remove {
        account_id: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// Manage demo mode
    Demo {
        #[command(subcommand)]
        command: Option<demo::DemoCommands>,
    },

    /// Serve the JSON API
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1", env = "HOST")]
        host: String,
        /// Port to listen on
        #[arg(short, long, default_value_t = 8001, env = "PORT")]
        port: u16,
    },
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so `--json` output stays parseable
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Enroll { user_id, token, name, json } => enroll::run(&user_id, &token, name.as_deref(), json),
        Commands::Accounts { user_id, json } => accounts::run(&user_id, json),
        Commands::Balance { account_id, live, json } => balance::run(&account_id, live, json),
        Commands::Transactions { account_id, live, limit, count, json } => {
            transactions::run(&account_id, live, limit, count.into(), json)
        }
        Commands::Refresh { account_ids, count, json } => refresh::run(&account_ids, count.into(), json),
        Commands::Status { json } => status::run(json),
        Commands::Remove { account_id, force } => remove::run(&account_id, force),
        Commands::Demo { command } => demo::run(command),
        Commands::Serve { host, port } => serve::run(&host, port),
    }
}
