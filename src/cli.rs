//! CLI interface for snapsolve.

use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod config;
pub mod providers;
pub mod repl;
pub mod solve;

/// snapsolve: explains screenshots of coding problems using an AI provider.
#[derive(Parser)]
#[command(name = "snapsolve")]
#[command(about = "Explains screenshots of coding problems using an AI provider", long_about = None)]
#[command(version)]
pub struct Cli {
    /// The main command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Main command categories.
#[derive(Subcommand)]
pub enum Commands {
    /// Solves the problem shown in a screenshot.
    Solve(solve::SolveCommand),
    /// Lists the supported providers and models.
    Providers(providers::ProvidersCommand),
    /// Configuration information.
    Config(config::ConfigCommand),
    /// Interactive session with runtime provider switching.
    Repl(repl::ReplCommand),
}

impl Cli {
    /// Executes the CLI command.
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Solve(cmd) => cmd.execute().await,
            Commands::Providers(cmd) => cmd.execute(),
            Commands::Config(cmd) => cmd.execute(),
            Commands::Repl(cmd) => cmd.execute().await,
        }
    }
}
