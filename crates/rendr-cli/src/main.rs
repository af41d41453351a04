//! rendr - server-side rendering harness.
//!
//! Parses arguments, initializes logging and dispatches to a command.

use clap::Parser;
use rendr_cli::{cli, commands, crash, error, logger, ui};
use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::init_colors(args.no_color);

    let result = match args.command {
        cli::Command::Routed(serve_args) => {
            commands::serve_execute(cli::BackendKind::Routed, serve_args, crash::install()).await
        }
        cli::Command::Component(serve_args) => {
            commands::serve_execute(cli::BackendKind::Component, serve_args, crash::install())
                .await
        }
        cli::Command::Check(check_args) => commands::check_execute(check_args).await,
    };

    result.map_err(error::cli_error_to_miette)
}
