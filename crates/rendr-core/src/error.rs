//! Error types for the render pipeline.
//!
//! Errors are split by blast radius:
//! - [`SupportError`] and [`BuildError`] are fatal at startup or on recompile
//! - [`RenderError`] is scoped to a single request and maps to an HTTP status

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Failures while loading the layout/template directory.
#[derive(Debug, Error)]
pub enum SupportError {
    /// The declared directory could not be listed.
    #[error("Failed to read support directory {}: {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file inside the directory could not be read as UTF-8 text.
    #[error("Failed to read support file {}: {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Request-scoped render failures.
///
/// None of these may take the listener down; each one is converted into a
/// response by the HTTP layer using [`RenderError::status_code`].
#[derive(Debug, Error)]
pub enum RenderError {
    /// The request body was not valid JSON.
    #[error("invalid JSON context: {0}")]
    InvalidPayload(#[source] serde_json::Error),

    /// A selector was given but no loaded layout carries that name.
    #[error("layout '{0}' not found")]
    LayoutNotFound(String),

    /// The backend needs a layout and the request did not name one.
    #[error("no layout requested, pass ?{0}=<file>")]
    LayoutNotRequested(&'static str),

    /// The request path could not be mapped to a compiled module.
    #[error("no compiled component for {}", .0.display())]
    ModuleNotFound(PathBuf),

    /// The request path tried to escape the module root.
    #[error("invalid component path '{0}'")]
    InvalidPath(String),

    /// The snapshot does not carry the artifacts this backend renders from.
    #[error("bundle snapshot does not contain {expected} artifacts")]
    IncompatibleSnapshot { expected: &'static str },

    /// The render worker could not be started or talked to.
    #[error("failed to run render worker '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The render worker exited unsuccessfully without a structured reply.
    #[error("render worker exited with code {code}: {stderr}")]
    WorkerExit { code: i32, stderr: String },

    /// The render worker wrote something that is not a render reply.
    #[error("unreadable render worker reply: {0}")]
    Protocol(String),

    /// The framework renderer threw.
    #[error("{message}")]
    Backend {
        message: String,
        stack: Option<String>,
    },
}

impl RenderError {
    /// HTTP status this error should be answered with.
    pub fn status_code(&self) -> u16 {
        match self {
            RenderError::InvalidPayload(_) => 400,
            _ => 500,
        }
    }

    /// Stack trace reported by the framework renderer, if any.
    pub fn stack(&self) -> Option<&str> {
        match self {
            RenderError::Backend { stack, .. } => stack.as_deref(),
            _ => None,
        }
    }
}

/// Compile and artifact failures.
///
/// A build that does not compile is not servable, so every variant is fatal
/// for the process.
#[derive(Debug, Error, Diagnostic)]
pub enum BuildError {
    /// The build command could not be spawned.
    #[error("Failed to run build command '{program}': {source}")]
    #[diagnostic(
        code(rendr::build::spawn_failed),
        help("Check the BUILD_COMMAND variable and that the bundler is installed")
    )]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The build command ran and reported errors.
    #[error("Build command exited with code {code}")]
    #[diagnostic(code(rendr::build::failed))]
    Failed {
        code: i32,
        #[help]
        diagnostics: String,
    },

    /// An expected artifact is missing after the build.
    #[error("Build artifact not found: {}", .0.display())]
    #[diagnostic(
        code(rendr::build::missing_artifact),
        help("Make sure the bundler writes its output into BUILD_DIR")
    )]
    MissingArtifact(PathBuf),

    /// An artifact exists but is not valid JSON.
    #[error("Build artifact {} is not valid JSON: {source}", .path.display())]
    #[diagnostic(code(rendr::build::invalid_artifact))]
    InvalidArtifact {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Production bundles are compiled once and never replaced.
    #[error("Recompiling is only available in development mode")]
    #[diagnostic(code(rendr::build::frozen))]
    Frozen,

    /// I/O failure while reading artifacts.
    #[error("I/O error while reading build output: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level error for the core crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Support(#[from] SupportError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Result alias defaulting to the core [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;
