//! Formatting utilities for sizes, durations and the startup banner.

use console::Term;
use owo_colors::OwoColorize;
use std::time::Duration;

/// Format file size in human-readable format.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format duration in human-readable format.
///
/// ```
/// use rendr_cli::ui::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();

    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// What the startup banner reports.
#[derive(Debug, Clone)]
pub struct Banner<'a> {
    pub backend: &'a str,
    pub mode: &'a str,
    pub address: String,
    pub selector_param: &'a str,
    pub layouts: Vec<&'a str>,
}

/// Print the listening banner to stderr.
pub fn print_banner(banner: &Banner<'_>) {
    let width = (Term::stderr().size().1 as usize).min(60);

    eprintln!();
    eprintln!(
        "  {} {} renderer ({})",
        "rendr".bold(),
        banner.backend.bright_white(),
        banner.mode.dimmed()
    );
    eprintln!("{}", "─".repeat(width));
    eprintln!("  {} http://{}", "▸ Listening:".blue(), banner.address);

    if banner.layouts.is_empty() {
        eprintln!("  {} {}", "▸ Layouts:".blue(), "none".dimmed());
    } else {
        eprintln!(
            "  {} {} {}",
            "▸ Layouts:".blue(),
            banner.layouts.join(", "),
            format!("(?{}=<name>)", banner.selector_param).dimmed()
        );
    }
    eprintln!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(10 * 1024 * 1024), "10.00 MB");
    }

    #[test]
    fn test_format_duration_milliseconds() {
        assert_eq!(format_duration(Duration::from_millis(0)), "0ms");
        assert_eq!(format_duration(Duration::from_millis(999)), "999ms");
    }

    #[test]
    fn test_format_duration_seconds() {
        assert_eq!(format_duration(Duration::from_millis(1000)), "1.00s");
        assert_eq!(format_duration(Duration::from_millis(59_999)), "60.00s");
    }

    #[test]
    fn test_format_duration_minutes() {
        assert_eq!(format_duration(Duration::from_secs(60)), "1m 0s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }

    #[test]
    fn test_print_banner() {
        print_banner(&Banner {
            backend: "routed",
            mode: "development",
            address: "0.0.0.0:4000".to_string(),
            selector_param: "template",
            layouts: vec!["main.html"],
        });
    }
}
