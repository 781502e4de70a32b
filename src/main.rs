//! reviewtask CLI entry point.
//!
//! Parses arguments, wires up logging from the verbosity flags, and
//! executes the selected command.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use reviewtask::cli::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.log_filter());

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            std::process::exit(1);
        }
    }
}

/// Initialize the tracing subscriber. An explicit `RUST_LOG` always wins
/// over the CLI verbosity flags; `--quiet` leaves logging off entirely.
fn init_logging(default_filter: Option<&str>) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if let Some(level) = default_filter {
        EnvFilter::new(level)
    } else {
        return;
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}
