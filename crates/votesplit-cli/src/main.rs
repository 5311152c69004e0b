//! votesplit CLI
//!
//! Replay delegation scripts against a fresh token and inspect the distributor.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

/// votesplit: partial-delegation voting power
///
/// Accounts split their balance across several delegatees; every change is checkpointed so
/// voting power can be read at any past block.
#[derive(Parser)]
#[command(name = "votesplit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Engine config file (JSON)
    #[arg(short, long, global = true, env = "VOTESPLIT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a script of ledger operations and print the resulting state
    Replay {
        /// Script file (JSON)
        #[arg(short, long)]
        script: PathBuf,

        /// Output format (human, json)
        #[arg(short, long, default_value = "human")]
        format: String,

        /// Audit all invariants after every step
        #[arg(long, default_value_t = false)]
        check: bool,
    },

    /// Show how a balance is split across a delegation set
    Distribute {
        /// Balance to split (decimal)
        #[arg(short, long)]
        balance: String,

        /// Delegation entry as `<address>:<share>`, repeatable, ascending by address
        #[arg(short, long = "delegation")]
        delegations: Vec<String>,

        /// Output format (human, json)
        #[arg(short, long, default_value = "human")]
        format: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Replay {
            script,
            format,
            check,
        } => commands::replay::run(script, format, check, cli.config),
        Commands::Distribute {
            balance,
            delegations,
            format,
        } => commands::distribute::run(balance, delegations, format, cli.config),
    }
}
