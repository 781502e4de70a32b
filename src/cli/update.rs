//! The `reviewtask update` command.
//!
//! Checks the release feed, and on confirmation downloads, verifies, and
//! installs a newer binary over the running executable, with automatic
//! backup and rollback. Also exposes check-only and status modes and a
//! manual `--rollback` escape hatch.

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::Parser;
use colored::Colorize;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::config::{GlobalConfig, should_check};
use crate::update::version::{self, VersionComparison};
use crate::update::{SelfUpdater, UpdateOutcome, UpdateRequest};
use crate::utils::progress;

/// Command-line arguments for the update command.
///
/// # Modes
///
/// - `reviewtask update` - upgrade to the latest release (with prompt)
/// - `reviewtask update 1.2.0` - install a specific version
/// - `reviewtask update --check` - check for updates without installing
/// - `reviewtask update --status` - show current and latest versions
/// - `reviewtask update --rollback` - restore the previous binary
#[derive(Parser, Debug)]
pub struct UpdateArgs {
    /// Target version to install (e.g. "1.2.0" or "v1.2.0").
    ///
    /// Defaults to the latest published release. Installing a version
    /// older than the current one requires `--force`.
    #[arg(value_name = "VERSION")]
    pub version: Option<String>,

    /// Check for updates without installing anything.
    #[arg(long, conflicts_with_all = ["status", "rollback"])]
    pub check: bool,

    /// Show the current version and the latest available.
    #[arg(short, long, conflicts_with = "rollback")]
    pub status: bool,

    /// Reinstall or downgrade even when not strictly newer.
    #[arg(short, long)]
    pub force: bool,

    /// Restore the previous binary from its backup.
    #[arg(long)]
    pub rollback: bool,

    /// Skip checksum verification of the downloaded artifact.
    #[arg(long)]
    pub no_verify: bool,

    /// Keep the backup file after a successful update.
    #[arg(long)]
    pub keep_backup: bool,

    /// Answer yes to the confirmation prompt.
    #[arg(short, long)]
    pub yes: bool,

    /// Network timeout in seconds for feed and artifact transfers.
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub timeout: u64,
}

impl UpdateArgs {
    /// Execute the update command.
    ///
    /// # Errors
    ///
    /// Fails on unrecoverable update errors; a cleanly rolled-back
    /// attempt also surfaces as an error after restoring the previous
    /// binary.
    pub async fn execute(self) -> Result<()> {
        let timeout = Duration::from_secs(self.timeout);
        let updater = SelfUpdater::new();

        if self.rollback {
            return handle_rollback(&updater).await;
        }
        if self.status {
            return show_status(&updater, timeout).await;
        }
        if self.check {
            return check_for_updates(&updater, timeout).await;
        }

        self.perform_update(&updater, timeout).await
    }

    async fn perform_update(&self, updater: &SelfUpdater, timeout: Duration) -> Result<()> {
        // Resolve the target first so the confirmation prompt can name it.
        let target_tag = match &self.version {
            Some(pinned) => {
                let relation = version::compare_str(updater.current_version(), pinned)
                    .context("Invalid target version")?;
                match relation {
                    VersionComparison::Older => {}
                    VersionComparison::Same if self.force => {}
                    VersionComparison::Same => {
                        println!(
                            "{}",
                            format!("Already on version {} (use --force to reinstall)", pinned)
                                .green()
                        );
                        return Ok(());
                    }
                    VersionComparison::Newer if self.force => {}
                    VersionComparison::Newer => {
                        bail!(
                            "Version {pinned} is older than the current {} (use --force to downgrade)",
                            updater.current_version()
                        );
                    }
                }
                pinned.clone()
            }
            None => match updater.check_for_update(timeout).await? {
                Some(release) => {
                    println!(
                        "Update available: {} -> {}",
                        updater.current_version().yellow(),
                        release.tag.trim_start_matches('v').green().bold()
                    );
                    release.tag
                }
                None if self.force => updater.latest_release(timeout).await?.tag,
                None => {
                    println!(
                        "{}",
                        format!("You are on the latest version ({})", updater.current_version())
                            .green()
                    );
                    return Ok(());
                }
            },
        };

        let target_display = target_tag.trim_start_matches('v').to_string();
        if !self.yes {
            let question = format!(
                "Replace the current binary with version {target_display}? [y/N]: "
            );
            if !confirm(&question).await? {
                println!("{}", "Update cancelled.".yellow());
                return Ok(());
            }
        }

        let request = UpdateRequest {
            target_version: Some(target_tag),
            allow_downgrade: self.force,
            verify_checksum: !self.no_verify,
            keep_backup: self.keep_backup,
            timeout,
        };

        println!("{}", format!("Updating to version {target_display}...").cyan());
        let outcome = updater.run(&request).await.map_err(|e| {
            // Rollback failure: the one loud, non-swallowed error.
            eprintln!("{}", format!("{e}").red().bold());
            anyhow::Error::from(e)
        })?;

        report_outcome(&outcome)
    }
}

async fn handle_rollback(updater: &SelfUpdater) -> Result<()> {
    if !updater.backup_available()? {
        bail!("No backup found. Cannot rollback.");
    }

    println!("{}", "Rolling back to previous version...".yellow());
    let target = updater.rollback().await.context("Failed to restore from backup")?;
    println!(
        "{}",
        format!("Successfully restored previous binary at {}", target.display()).green()
    );
    Ok(())
}

async fn show_status(updater: &SelfUpdater, timeout: Duration) -> Result<()> {
    let current = updater.current_version();

    let latest = match updater.check_for_update(timeout).await {
        Ok(result) => result,
        Err(e) => {
            debug!("Failed to check for updates: {e}");
            None
        }
    };

    match &latest {
        Some(release) => {
            println!("Current version: {current}");
            println!(
                "Latest version:  {} (update available)",
                release.tag.trim_start_matches('v')
            );
        }
        None => println!("Current version: {current} (up to date)"),
    }

    let config = GlobalConfig::load().await.unwrap_or_default();
    let updates = &config.updates;
    if updates.enabled && updates.check_interval_hours > 0 {
        let due = should_check(
            updates.enabled,
            updates.check_interval_hours,
            updates.last_checked_at,
            Utc::now(),
        );
        println!(
            "Automatic checks: every {}h ({})",
            updates.check_interval_hours,
            if due { "check due" } else { "checked recently" }
        );
    } else {
        println!("Automatic checks: disabled");
    }

    Ok(())
}

async fn check_for_updates(updater: &SelfUpdater, timeout: Duration) -> Result<()> {
    let mut config = GlobalConfig::load().await.unwrap_or_default();

    let spinner = progress::spinner_with_message("Checking for updates...");
    let result = updater.check_for_update(timeout).await;
    spinner.finish_and_clear();

    // Record the check time regardless of the result we report.
    config.mark_checked(Utc::now());
    if let Err(e) = config.save().await {
        debug!("Failed to persist check time: {e}");
    }

    match result? {
        Some(release) if release.is_prerelease && !config.updates.notify_prereleases => {
            println!(
                "{}",
                format!(
                    "A prerelease ({}) is available; prerelease notifications are disabled",
                    release.tag.trim_start_matches('v')
                )
                .yellow()
            );
        }
        Some(release) => {
            println!(
                "{}",
                format!(
                    "Update available: {} -> {}",
                    updater.current_version(),
                    release.tag.trim_start_matches('v')
                )
                .green()
            );
            if !release.title.is_empty() {
                println!("  {}", release.title);
            }
            println!("  {}", release.page_url.dimmed());
            println!("Run {} to install it", "reviewtask update".cyan().bold());
        }
        None => {
            println!(
                "{}",
                format!("You are on the latest version ({})", updater.current_version()).green()
            );
        }
    }

    Ok(())
}

fn report_outcome(outcome: &UpdateOutcome) -> Result<()> {
    if outcome.succeeded {
        if outcome.updated() {
            println!(
                "{}",
                format!(
                    "Successfully updated {} -> {}",
                    outcome.previous_version, outcome.new_version
                )
                .green()
                .bold()
            );
            if let Some(backup) = &outcome.backup_path {
                println!("Previous binary kept at {}", backup.display());
            }
        } else {
            println!(
                "{}",
                format!("Already on version {}", outcome.new_version).green()
            );
        }
        return Ok(());
    }

    let detail = outcome.error_detail.as_deref().unwrap_or("unknown error");
    if let Some(backup) = &outcome.backup_path {
        eprintln!("{}", "Update failed; previous binary was restored.".red());
        eprintln!("Backup remains at {}", backup.display());
        bail!("Update failed (rolled back): {detail}");
    }
    bail!("Update failed: {detail}");
}

/// Ask a yes/no question on stdout and read the answer from stdin.
/// Defaults to "no" on an empty answer.
async fn confirm(question: &str) -> Result<bool> {
    use std::io::Write;

    print!("{question}");
    std::io::stdout().flush()?;

    let mut reader = BufReader::new(tokio::io::stdin());
    let mut response = String::new();
    reader.read_line(&mut response).await?;
    let response = response.trim().to_lowercase();

    Ok(response == "y" || response == "yes")
}
