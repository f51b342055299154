//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{self, GlobalOptions};

/// dynasync - Sync file history through a shared store
#[derive(Parser, Debug)]
#[command(name = "dynasync")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,

    /// Directory of the shared store
    #[arg(long, global = true, value_name = "DIR", env = "DYNASYNC_STORE")]
    store: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Track the current directory as a repository
    Init(commands::init::InitArgs),

    /// Commit changed files to the shared store
    Commit(commands::commit::CommitArgs),

    /// Label tracked files
    Tag(commands::tag::TagArgs),

    /// Rebuild a repository into a new directory
    Clone(commands::clone::CloneArgs),

    /// Show commit history
    Log(commands::log::LogArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        // RUST_LOG still wins when set
        env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(self.log_level.as_str()),
        )
        .format_timestamp(None)
        .init();

        let globals = GlobalOptions {
            store: self.store,
            color: self.color,
        };

        match self.command {
            Commands::Init(args) => commands::init::execute(args, &globals),
            Commands::Commit(args) => commands::commit::execute(args, &globals),
            Commands::Tag(args) => commands::tag::execute(args, &globals),
            Commands::Clone(args) => commands::clone::execute(args, &globals),
            Commands::Log(args) => commands::log::execute(args, &globals),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}
