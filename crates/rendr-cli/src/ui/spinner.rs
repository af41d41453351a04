//! Spinner for the initial compile.

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::time::Duration;

/// Spinner for tasks without known duration.
///
/// Hidden when stderr is not a terminal, so piped logs stay clean.
pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    /// Create and start a new spinner.
    pub fn new(message: &str) -> Self {
        let pb = if super::is_interactive() {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["◐", "◓", "◑", "◒"]);
        pb.set_style(style);
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self { pb }
    }

    /// Finish spinner with a green checkmark.
    pub fn finish(&self, message: &str) {
        self.pb
            .finish_with_message(format!("{} {}", "✓".green(), message));
    }

    /// Finish spinner with a red X.
    pub fn fail(&self, message: &str) {
        self.pb
            .finish_with_message(format!("{} {}", "✗".red(), message));
    }
}
