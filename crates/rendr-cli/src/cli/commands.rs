use clap::{Args, Subcommand};

use crate::cli::enums::BackendKind;

/// Available rendr subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the routed renderer (server bundle + client manifest)
    ///
    /// Reads VUE_* variables. Requests pick a layout with `?template=<file>`.
    Routed(ServeArgs),

    /// Serve the compiled-component renderer
    ///
    /// Reads SVELTE_* variables. Requests pick a layout with `?layout=<file>`.
    Component(ServeArgs),

    /// Validate configuration and list layouts
    ///
    /// Resolves every variable and loads the layout directory, then exits
    /// without compiling or binding a port.
    Check(CheckArgs),
}

impl Command {
    /// Backend the command operates on.
    pub fn backend(&self) -> BackendKind {
        match self {
            Command::Routed(_) => BackendKind::Routed,
            Command::Component(_) => BackendKind::Component,
            Command::Check(args) => args.backend,
        }
    }
}

/// Arguments for the serve commands
#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Port to listen on
    ///
    /// Overrides NODE_PORT and PORT.
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Address to bind
    ///
    /// Overrides HOST.
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,
}

/// Arguments for the check command
#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Backend whose configuration to validate
    #[arg(value_enum)]
    pub backend: BackendKind,
}
