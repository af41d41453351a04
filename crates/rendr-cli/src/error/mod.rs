//! Error handling for the rendr CLI.
//!
//! - **Top-level errors** (`CliError`) cover each stage of running the service
//! - **Domain errors** (`ConfigError`, and the core crate's build/support
//!   errors) carry the detail
//! - Conversion is automatic via `#[from]`
//!
//! Everything that reaches `main` is fatal and is reported through
//! [`cli_error_to_miette`].

mod miette;

pub use self::miette::cli_error_to_miette;

use rendr_core::{BuildError, SupportError};
use std::path::PathBuf;
use thiserror::Error;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Environment configuration is missing or invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The bundler failed or left unusable output
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// The layout directory could not be loaded
    #[error("Layout error: {0}")]
    Support(#[from] SupportError),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The listener could not be bound or failed while serving
    #[error("Server error: {0}")]
    Server(String),

    /// File watching errors
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// A panic was caught; the process is going down
    #[error("Crashed: {0}")]
    Crashed(String),

    /// Generic errors with custom messages
    #[error("{0}")]
    Custom(String),
}

/// Configuration errors.
///
/// Raised while reading the environment, before anything is compiled.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is not set
    #[error("Missing required variable: {var}\n\nHint: {hint}")]
    MissingVar {
        /// Full variable name, prefix included
        var: String,
        /// How to provide it
        hint: String,
    },

    /// A variable is set to something unusable
    #[error("Invalid value for '{var}': {value}\n\nHint: {hint}")]
    InvalidValue {
        var: String,
        value: String,
        hint: String,
    },

    /// A configured directory or file does not exist
    #[error("{var} points to a missing path: {}\n\nHint: Create it or fix the variable", .path.display())]
    MissingPath { var: String, path: PathBuf },

    /// The environment could not be extracted at all
    #[error("Failed to read environment: {0}")]
    Extract(#[from] figment::Error),
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Extension trait for adding context to `Result` types.
pub trait ResultExt<T> {
    /// Add a helpful hint to the error.
    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T>;

    /// Prefix the error with what was being attempted.
    fn context(self, msg: impl std::fmt::Display) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}\n\nHint: {}", err, hint))
        })
    }

    fn context(self, msg: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}: {}", msg, err))
        })
    }
}
