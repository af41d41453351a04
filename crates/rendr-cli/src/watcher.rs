//! Source watcher for development mode.
//!
//! Watches the component directory and the routes module's directory,
//! ignoring dependencies, editor droppings and the build output itself.

use crate::error::{CliError, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Patterns ignored under every watched root.
pub const DEFAULT_IGNORE: &[&str] = &["node_modules", "*.swp", "*~", "*.tmp"];

/// How long to wait for related changes before rebuilding.
pub const DEBOUNCE: Duration = Duration::from_millis(100);

/// File change event type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Modified(PathBuf),
    Created(PathBuf),
    Removed(PathBuf),
}

impl FileChange {
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Modified(p) | FileChange::Created(p) | FileChange::Removed(p) => p,
        }
    }
}

/// Paths the watcher skips.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    /// Relative patterns: a directory name, or `*.ext`
    pub patterns: Vec<String>,
    /// Absolute directories, typically the build output
    pub excluded: Vec<PathBuf>,
}

impl IgnoreRules {
    pub fn new(excluded: Vec<PathBuf>) -> Self {
        Self {
            patterns: DEFAULT_IGNORE.iter().map(|p| p.to_string()).collect(),
            excluded,
        }
    }

    /// Check if a change under one of `roots` should be dropped.
    pub fn should_ignore(&self, path: &Path, roots: &[PathBuf]) -> bool {
        if self.excluded.iter().any(|dir| path.starts_with(dir)) {
            return true;
        }

        // Only watch files within a root
        let Some(rel_path) = roots.iter().find_map(|root| path.strip_prefix(root).ok()) else {
            return true;
        };

        let path_str = rel_path.to_string_lossy();
        for pattern in &self.patterns {
            if let Some(ext) = pattern.strip_prefix('*') {
                if path_str.ends_with(ext) {
                    return true;
                }
            } else if rel_path
                .components()
                .any(|c| c.as_os_str() == pattern.as_str())
            {
                return true;
            }
        }

        // Hidden files and directories
        rel_path.components().any(|component| {
            component
                .as_os_str()
                .to_str()
                .is_some_and(|name| name.starts_with('.') && name != "." && name != "..")
        })
    }
}

/// Recursive watcher over several roots.
///
/// Dropping it stops watching.
pub struct SourceWatcher {
    _watcher: RecommendedWatcher,
    roots: Vec<PathBuf>,
}

impl SourceWatcher {
    /// Start watching `roots`.
    ///
    /// Returns the watcher and the receiver changes arrive on. Repeated
    /// events for the same file within [`DEBOUNCE`] are dropped.
    ///
    /// # Errors
    ///
    /// Returns error if a root does not exist or cannot be watched
    pub fn new(
        roots: Vec<PathBuf>,
        rules: IgnoreRules,
    ) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        if let Some(missing) = roots.iter().find(|root| !root.exists()) {
            return Err(CliError::Custom(format!(
                "Cannot watch missing directory {}",
                missing.display()
            )));
        }

        let (tx, rx) = mpsc::channel(100);
        let mut last_event: Option<(PathBuf, Instant)> = None;
        let handler_roots = roots.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!("Watch error: {}", e);
                    return;
                }
            };

            for path in &event.paths {
                if rules.should_ignore(path, &handler_roots) {
                    continue;
                }

                let now = Instant::now();
                if let Some((last_path, last_time)) = &last_event {
                    if last_path == path && now.duration_since(*last_time) < DEBOUNCE {
                        continue;
                    }
                }
                last_event = Some((path.clone(), now));

                let change = match event.kind {
                    EventKind::Create(_) => FileChange::Created(path.clone()),
                    EventKind::Modify(_) => FileChange::Modified(path.clone()),
                    EventKind::Remove(_) => FileChange::Removed(path.clone()),
                    _ => continue,
                };

                // Runs on notify's thread, outside the runtime
                let _ = tx.blocking_send(change);
            }
        })?;

        for root in &roots {
            watcher.watch(root, RecursiveMode::Recursive)?;
            tracing::debug!("Watching {}", root.display());
        }

        Ok((
            Self {
                _watcher: watcher,
                roots,
            },
            rx,
        ))
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

/// Collect `first` plus everything that arrives within `window`, one entry
/// per path, so a burst of saves triggers a single rebuild.
pub async fn coalesce(
    first: FileChange,
    rx: &mut mpsc::Receiver<FileChange>,
    window: Duration,
) -> Vec<FileChange> {
    tokio::time::sleep(window).await;

    let mut seen = HashSet::new();
    let mut changes = Vec::new();
    let mut next = Some(first);

    while let Some(change) = next {
        if seen.insert(change.path().to_path_buf()) {
            changes.push(change);
        }
        next = rx.try_recv().ok();
    }

    changes
}
