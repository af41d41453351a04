//! Serve command implementation.
//!
//! Orchestrates the service lifecycle:
//! - Load configuration and layouts
//! - Bind the listener and start answering (requests queue until ready)
//! - Initial compile, or pre-built artifacts in production
//! - Development: watch sources, recompile, notify reload clients
//! - Shut down on Ctrl+C, compile failure or panic

use crate::cli::{BackendKind, ServeArgs};
use crate::config::ServerConfig;
use crate::crash::CrashSignal;
use crate::error::{CliError, Result, ResultExt};
use crate::server::{AppState, DevEvent, RenderServer, SharedState};
use crate::ui;
use crate::watcher::{self, FileChange, IgnoreRules, SourceWatcher};
use rendr_core::{
    BundleBackend, CommandCompiler, ComponentBackend, Pipeline, Published, RenderBackend,
    RenderWorker, Supervisor,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::{mpsc, oneshot};

/// Execute a serve command for `backend`.
///
/// # Errors
///
/// Returns errors for:
/// - Invalid configuration or unreadable layouts
/// - Bind failures
/// - Compile failures, initial or after a change
/// - A panic anywhere in the process
pub async fn execute(backend: BackendKind, args: ServeArgs, crash: CrashSignal) -> Result<()> {
    let config = ServerConfig::load(backend, &args)?;
    let layouts = config.load_layouts()?;

    let server = RenderServer::bind(&config.address()).await?;
    let address = server.local_addr()?;

    let pipeline = Pipeline::new(
        render_backend(&config),
        layouts,
        config.asset_base(address.port()),
    )
    .with_markers(config.markers.clone());
    let compiler = Arc::new(CommandCompiler::new(config.build_command.clone()));
    let supervisor = Arc::new(Supervisor::new(
        config.mode,
        compiler,
        config.artifact_layout(),
    ));
    let state: SharedState = Arc::new(AppState::new(supervisor, pipeline));

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let mut server_task = tokio::spawn(server.serve(state.clone(), async move {
        let _ = shutdown_rx.await;
    }));

    ui::print_banner(&ui::Banner {
        backend: backend.name(),
        mode: config.mode.node_env(),
        address: address.to_string(),
        selector_param: state.pipeline.selector_param(),
        layouts: state.pipeline.layouts().names().collect(),
    });

    let outcome = run(&config, &state, crash, &mut server_task).await;

    // Drain in-flight requests before leaving
    let _ = shutdown_tx.send(());
    if !server_task.is_finished() {
        if let Ok(Err(e)) = server_task.await {
            tracing::warn!("Listener did not shut down cleanly: {}", e);
        }
    }

    if outcome.is_ok() {
        ui::success("Server stopped");
    }
    outcome
}

fn render_backend(config: &ServerConfig) -> Arc<dyn RenderBackend> {
    let worker = RenderWorker::new(config.render_command.clone());
    match config.backend {
        BackendKind::Routed => Arc::new(BundleBackend::new(worker, config.context_key.clone())),
        BackendKind::Component => Arc::new(
            ComponentBackend::new(worker, config.context_key.clone())
                .with_mount_selector(config.mount_selector.clone()),
        ),
    }
}

/// Everything between binding and shutdown.
async fn run(
    config: &ServerConfig,
    state: &SharedState,
    mut crash: CrashSignal,
    server_task: &mut tokio::task::JoinHandle<Result<()>>,
) -> Result<()> {
    let spinner = ui::Spinner::new(&format!("Compiling with `{}`...", config.build_command));
    let started = tokio::select! {
        result = state.supervisor.start() => result,
        _ = signal::ctrl_c() => {
            spinner.fail("Interrupted");
            return Ok(());
        }
        message = crash.crashed() => {
            spinner.fail("Crashed");
            return Err(CliError::Crashed(message));
        }
    };

    match started {
        Ok(published) => spinner.finish(&describe(&published)),
        Err(e) => {
            spinner.fail("Build failed");
            return Err(e.into());
        }
    }

    let mut changes = if config.mode.is_development() {
        let rules = IgnoreRules::new(vec![
            config.build_dir.clone(),
            config.client_build_dir.clone(),
        ]);
        let (source_watcher, rx) = SourceWatcher::new(config.watch_paths(), rules)
            .context("Failed to watch sources")?;
        for root in source_watcher.roots() {
            ui::info(&format!("Watching {}", root.display()));
        }
        Some((source_watcher, rx))
    } else {
        None
    };

    ui::info("Press Ctrl+C to stop");

    // Changes arriving mid-build stay queued until it finishes
    let mut building: Option<Build<'_>> = None;

    loop {
        tokio::select! {
            Some(change) = next_change(&mut changes), if building.is_none() => {
                let Some((_, rx)) = changes.as_mut() else { continue };
                let batch = watcher::coalesce(change, rx, watcher::DEBOUNCE).await;
                building = Some(Box::pin(rebuild(state, batch)));
            }

            result = next_build(&mut building) => {
                building = None;
                result?;
            }

            _ = signal::ctrl_c() => {
                ui::info("Shutting down...");
                return Ok(());
            }

            message = crash.crashed() => {
                return Err(CliError::Crashed(message));
            }

            result = &mut *server_task => {
                return match result {
                    Ok(Ok(())) => Err(CliError::Server("Listener stopped unexpectedly".to_string())),
                    Ok(Err(e)) => Err(e),
                    Err(e) => Err(CliError::Server(format!("Listener task failed: {}", e))),
                };
            }
        }
    }
}

type Build<'a> = Pin<Box<dyn Future<Output = Result<()>> + 'a>>;

async fn next_build(building: &mut Option<Build<'_>>) -> Result<()> {
    match building {
        Some(build) => build.await,
        None => std::future::pending().await,
    }
}

async fn next_change(
    changes: &mut Option<(SourceWatcher, mpsc::Receiver<FileChange>)>,
) -> Option<FileChange> {
    match changes {
        Some((_, rx)) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Recompile after a batch of changes and tell reload clients.
///
/// A failed rebuild is fatal: the caller returns the error and the process
/// exits 1.
async fn rebuild(state: &SharedState, batch: Vec<FileChange>) -> Result<()> {
    match batch.as_slice() {
        [single] => ui::info(&format!("Changed: {}", single.path().display())),
        _ => ui::info(&format!("{} files changed", batch.len())),
    }

    state.reload.broadcast(&DevEvent::BuildStarted).await;

    let published = match state.supervisor.recompile().await {
        Ok(published) => published,
        Err(e) => {
            ui::error("Rebuild failed");
            return Err(e.into());
        }
    };
    ui::success(&describe(&published));

    let duration_ms = published.report.as_ref().map_or(0, |r| r.duration_ms);
    state
        .reload
        .broadcast(&DevEvent::BuildCompleted {
            generation: published.snapshot.generation,
            duration_ms,
        })
        .await;

    Ok(())
}

fn describe(published: &Published) -> String {
    let cache = &published.snapshot.assets;
    let assets = format!(
        "{} client assets, {}",
        cache.len(),
        ui::format_size(cache.total_bytes())
    );
    match &published.report {
        Some(report) => format!(
            "Compiled in {} ({})",
            ui::format_duration(Duration::from_millis(report.duration_ms)),
            assets
        ),
        None => format!("Loaded pre-built artifacts ({})", assets),
    }
}
