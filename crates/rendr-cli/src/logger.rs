//! Logging setup.
//!
//! Everything logs through `tracing`. The level is picked in this order:
//! 1. `--verbose`: DEBUG for rendr crates
//! 2. `--quiet`: ERROR only
//! 3. `RUST_LOG`
//! 4. INFO for rendr crates

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const VERBOSE_FILTER: &str = "rendr=debug,rendr_core=debug,rendr_cli=debug";
const QUIET_FILTER: &str = "rendr=error,rendr_core=error,rendr_cli=error";
const DEFAULT_FILTER: &str = "rendr=info,rendr_core=info,rendr_cli=info";

/// Build the filter for the given flags.
pub fn filter_for(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Initialize the global subscriber. Call once, before anything logs.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .compact();

    tracing_subscriber::registry()
        .with(filter_for(verbose, quiet))
        .with(fmt_layer)
        .init();
}
