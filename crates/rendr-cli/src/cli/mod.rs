//! Command-line interface definition for rendr.
//!
//! - `rendr routed` - serve the routed single-page-app renderer
//! - `rendr component` - serve the compiled-component renderer
//! - `rendr check <backend>` - validate the environment without compiling
//!
//! Almost everything else is configured through environment variables, see
//! [`crate::config`].

mod commands;
pub mod enums;

use clap::Parser;

pub use commands::{CheckArgs, Command, ServeArgs};
pub use enums::BackendKind;

/// rendr - server-side rendering harness
#[derive(Parser, Debug)]
#[command(
    name = "rendr",
    version,
    about = "Server-side rendering harness for routed and component front-ends",
    long_about = "rendr drives a front-end bundler, keeps the compiled server bundle in memory\n\
                  and renders pages over HTTP by combining a layout, the rendered component\n\
                  tree and a JSON context posted by the caller."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}
