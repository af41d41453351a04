//! Bundler invocation.
//!
//! The framework bundlers are external programs. A [`Compiler`] runs one
//! build to completion and reports how it went; reading the artifacts is left
//! to [`ArtifactLayout`](crate::artifacts::ArtifactLayout).

use crate::command::CommandLine;
use crate::error::BuildError;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Instant;

/// Outcome of one successful build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileReport {
    /// Wall-clock build time in milliseconds
    pub duration_ms: u64,
    /// Bundler stdout, for debug logging
    pub output: String,
}

/// Something that can produce build artifacts.
#[async_trait]
pub trait Compiler: Send + Sync {
    /// Run one build to completion.
    async fn compile(&self) -> Result<CompileReport, BuildError>;
}

/// Runs the configured build command.
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    command: CommandLine,
}

impl CommandCompiler {
    pub fn new(command: CommandLine) -> Self {
        Self { command }
    }

    pub fn command(&self) -> &CommandLine {
        &self.command
    }
}

#[async_trait]
impl Compiler for CommandCompiler {
    async fn compile(&self) -> Result<CompileReport, BuildError> {
        let start = Instant::now();
        tracing::debug!("Running build command: {}", self.command);

        let output = self
            .command
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| BuildError::Spawn {
                program: self.command.program.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            // Bundlers disagree on which stream carries the errors
            let diagnostics = match (stderr.is_empty(), stdout.is_empty()) {
                (false, false) => format!("{}\n{}", stderr, stdout),
                (false, true) => stderr,
                _ => stdout,
            };
            return Err(BuildError::Failed {
                code: output.status.code().unwrap_or(-1),
                diagnostics,
            });
        }

        if !stderr.is_empty() {
            tracing::warn!("Build command wrote to stderr:\n{}", stderr);
        }

        Ok(CompileReport {
            duration_ms: start.elapsed().as_millis() as u64,
            output: stdout,
        })
    }
}
