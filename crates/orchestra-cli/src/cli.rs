//! CLI command definitions using clap.

use clap::{Parser, Subcommand};

/// Orchestra CLI - exercise the agent orchestration engine from a terminal
#[derive(Parser)]
#[command(name = "orchestra")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one query through the in-process orchestrator
    Query {
        /// The query text
        text: String,

        /// Session identifier (created if it does not already exist)
        #[arg(short, long, default_value = "cli-session")]
        session: String,
    },

    /// Registry inspection commands
    Registry {
        #[command(subcommand)]
        action: RegistryCommands,
    },
}

#[derive(Subcommand)]
pub enum RegistryCommands {
    /// Print the built-in demo tool catalog
    List,
}
