//! Terminal output for humans.
//!
//! Logs go through `tracing`; this module covers the few lines a person
//! watching the terminal cares about: compile progress, the listening banner
//! and status messages. Output degrades cleanly when stderr is not a TTY.

mod format;
mod messages;
mod spinner;

pub use format::{format_duration, format_size, print_banner, Banner};
pub use messages::{error, info, success, warning};
pub use spinner::Spinner;

/// Check if color output should be enabled.
///
/// Respects NO_COLOR and FORCE_COLOR, then falls back to terminal detection.
pub fn should_use_color() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    console::user_attended_stderr()
}

/// Apply the color decision to terminal styling.
///
/// `--no-color` always wins over the environment.
pub fn init_colors(no_color: bool) {
    console::set_colors_enabled_stderr(!no_color && should_use_color());
}

/// Whether a spinner makes sense (interactive stderr).
pub fn is_interactive() -> bool {
    console::user_attended_stderr()
}
