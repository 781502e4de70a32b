//! Command-line interface for reviewtask.
//!
//! Each subcommand lives in its own module with its own argument struct
//! and execution logic. Global flags control output verbosity:
//!
//! - `--verbose` maps to debug-level logging
//! - `--quiet` suppresses logging entirely
//!
//! `RUST_LOG`, when set, always wins over both.

pub mod update;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Top-level argument parser for the `reviewtask` binary.
#[derive(Parser, Debug)]
#[command(name = "reviewtask", version, about = "AI-powered PR review management tool")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output for debugging.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check for and install newer reviewtask releases.
    Update(update::UpdateArgs),
}

impl Cli {
    /// The log filter implied by the verbosity flags, or `None` when
    /// logging should stay off.
    #[must_use]
    pub fn log_filter(&self) -> Option<&'static str> {
        if self.quiet {
            None
        } else if self.verbose {
            Some("debug")
        } else {
            Some("warn")
        }
    }

    /// Execute the selected subcommand.
    ///
    /// # Errors
    ///
    /// Propagates the subcommand's failure for `main` to report.
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Update(cmd) => cmd.execute().await,
        }
    }
}
