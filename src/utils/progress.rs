//! Progress reporting helpers built on `indicatif`.
//!
//! Bars draw to stderr and disappear automatically when stderr is not a
//! terminal, so piped and CI output stays clean.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Create a byte-denominated progress bar for a download.
///
/// With an unknown content length this degrades to a spinner that still
/// shows transferred bytes.
#[must_use]
pub fn download_bar(total_bytes: Option<u64>) -> ProgressBar {
    match total_bytes {
        Some(len) => {
            let bar = ProgressBar::new(len);
            bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.cyan} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({eta})",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
            );
            bar
        }
        None => {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::with_template("{spinner:.cyan} {bytes} downloaded")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        }
    }
}

/// Create a spinner with a status message for indeterminate work.
#[must_use]
pub fn spinner_with_message(msg: impl Into<String>) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(msg.into());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_tracks_position() {
        let bar = download_bar(Some(100));
        bar.inc(40);
        assert_eq!(bar.position(), 40);
        bar.finish_and_clear();
    }

    #[test]
    fn spinner_has_no_length() {
        let bar = download_bar(None);
        assert!(bar.length().is_none());
        bar.finish_and_clear();
    }
}
