//! Render worker process integration.
//!
//! The framework renderers live in an external JavaScript process. Each render
//! spawns the configured worker, writes one JSON request to its stdin and reads
//! one JSON reply from its stdout.
//!
//! Reply shapes:
//! - `{"html": "...", "head": "...", "css": "..." | {"code": "..."} | null}`
//! - `"<html string>"`
//! - `{"error": {"message": "...", "stack": "..."}}`

use crate::command::CommandLine;
use crate::context::RenderResult;
use crate::error::RenderError;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

/// Maximum allowed size for a worker reply (50 MB)
const MAX_OUTPUT_SIZE: u64 = 50 * 1024 * 1024;

/// Read at most `limit` bytes. Returns `None` when the stream holds more.
async fn read_capped<R: AsyncRead + Unpin>(
    reader: R,
    limit: u64,
) -> std::io::Result<Option<Vec<u8>>> {
    let mut buf = Vec::new();
    reader.take(limit + 1).read_to_end(&mut buf).await?;
    if buf.len() as u64 > limit {
        Ok(None)
    } else {
        Ok(Some(buf))
    }
}

/// Spawns the render worker for each request.
#[derive(Debug, Clone)]
pub struct RenderWorker {
    command: CommandLine,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WorkerReply {
    Failure { error: WorkerFailure },
    Fragments(Fragments),
    Html(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WorkerFailure {
    Detailed {
        message: String,
        #[serde(default)]
        stack: Option<String>,
    },
    Message(String),
}

#[derive(Debug, Deserialize)]
struct Fragments {
    html: String,
    #[serde(default)]
    head: Option<String>,
    #[serde(default)]
    css: Option<Css>,
}

/// Compiled components report CSS either as a string or as `{code, map}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Css {
    Text(String),
    Compiled {
        #[serde(default)]
        code: Option<String>,
    },
}

impl RenderWorker {
    pub fn new(command: CommandLine) -> Self {
        Self { command }
    }

    pub fn command(&self) -> &CommandLine {
        &self.command
    }

    /// Run one render request through the worker.
    pub async fn render<T: Serialize + ?Sized>(
        &self,
        request: &T,
    ) -> Result<RenderResult, RenderError> {
        let input = serde_json::to_vec(request)
            .map_err(|e| RenderError::Protocol(format!("cannot encode request: {}", e)))?;

        let spawn_failed = |source| RenderError::Spawn {
            program: self.command.program.clone(),
            source,
        };

        let mut cmd = self.command.to_command();
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(spawn_failed)?;

        let pipe = |name: &str| {
            spawn_failed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                format!("Failed to capture {}", name),
            ))
        };
        let mut stdin = child.stdin.take().ok_or_else(|| pipe("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| pipe("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| pipe("stderr"))?;

        // A worker that exits early closes the pipe; its exit status says why
        if let Err(e) = stdin.write_all(&input).await {
            tracing::debug!("Render worker closed stdin early: {}", e);
        }
        drop(stdin);

        let (stdout, stderr) = tokio::join!(
            read_capped(stdout, MAX_OUTPUT_SIZE),
            read_capped(stderr, MAX_OUTPUT_SIZE),
        );
        // Returning early drops the child, which kills it
        let (Some(stdout), Some(stderr)) = (
            stdout.map_err(spawn_failed)?,
            stderr.map_err(spawn_failed)?,
        ) else {
            return Err(RenderError::Protocol(format!(
                "worker output exceeds {} bytes",
                MAX_OUTPUT_SIZE
            )));
        };

        let status = child.wait().await.map_err(spawn_failed)?;

        let stderr = String::from_utf8_lossy(&stderr);
        if !stderr.trim().is_empty() {
            tracing::debug!("Render worker stderr: {}", stderr.trim());
        }

        let reply = serde_json::from_slice::<WorkerReply>(&stdout);

        match (reply, status.success()) {
            (Ok(WorkerReply::Failure { error }), _) => Err(error.into()),
            (Ok(reply), true) => Ok(reply.into_result()),
            (Ok(_), false) | (Err(_), false) => Err(RenderError::WorkerExit {
                code: status.code().unwrap_or(-1),
                stderr: stderr.trim().to_string(),
            }),
            (Err(e), true) => Err(RenderError::Protocol(e.to_string())),
        }
    }
}

impl WorkerReply {
    fn into_result(self) -> RenderResult {
        match self {
            WorkerReply::Html(html) => RenderResult::html(html),
            WorkerReply::Fragments(fragments) => RenderResult {
                html: fragments.html,
                head: fragments.head.unwrap_or_default(),
                css: fragments.css.and_then(|css| match css {
                    Css::Text(text) => Some(text),
                    Css::Compiled { code } => code,
                }),
            },
            WorkerReply::Failure { .. } => RenderResult::default(),
        }
    }
}

impl From<WorkerFailure> for RenderError {
    fn from(failure: WorkerFailure) -> Self {
        match failure {
            WorkerFailure::Detailed { message, stack } => RenderError::Backend { message, stack },
            WorkerFailure::Message(message) => RenderError::Backend {
                message,
                stack: None,
            },
        }
    }
}
