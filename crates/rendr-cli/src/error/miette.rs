//! Miette diagnostic conversion for CLI errors.

use crate::error::CliError;
use miette::Report;

/// Convert CliError to miette Report
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        // Build errors carry their own codes and help text
        CliError::Build(e) => Report::new(e),
        CliError::Config(e) => miette::miette!("Configuration error: {}", e),
        _ => miette::miette!("{}", err),
    }
}
