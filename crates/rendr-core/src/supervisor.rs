//! Compile lifecycle.
//!
//! The supervisor owns the bundle store and the phase the service is in.
//! Requests wait on [`Supervisor::wait_ready`], so nothing renders while a
//! compile is running and the listener never has to be detached.

use crate::artifacts::ArtifactLayout;
use crate::bundle::{BundleSnapshot, BundleStore};
use crate::compiler::{CompileReport, Compiler};
use crate::error::BuildError;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

/// Runtime mode, chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Watch sources, recompile on change, serve client assets.
    Development,
    /// Compile once, never replace the bundle.
    Production,
}

impl Mode {
    /// Interpret a `NODE_ENV` value. `test` runs like production.
    pub fn from_node_env(value: Option<&str>, default: Mode) -> Mode {
        match value.map(str::trim) {
            None | Some("") => default,
            Some("development") => Mode::Development,
            Some("production") | Some("test") => Mode::Production,
            Some(other) => {
                tracing::warn!("Unknown NODE_ENV '{}', running in production mode", other);
                Mode::Production
            }
        }
    }

    /// Value handed to the bundler as `NODE_ENV`.
    pub fn node_env(self) -> &'static str {
        match self {
            Mode::Development => "development",
            Mode::Production => "production",
        }
    }

    pub fn is_development(self) -> bool {
        self == Mode::Development
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.node_env())
    }
}

/// Where the compile lifecycle currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// A build is running; requests wait.
    Compiling,
    /// The current snapshot is servable.
    Ready,
    /// The last build failed; the process is about to exit.
    Failed(String),
}

impl Phase {
    pub fn is_ready(&self) -> bool {
        matches!(self, Phase::Ready)
    }
}

/// A published snapshot and the build that produced it.
#[derive(Debug, Clone)]
pub struct Published {
    pub snapshot: Arc<BundleSnapshot>,
    /// `None` when pre-built artifacts were loaded without compiling
    pub report: Option<CompileReport>,
}

/// Drives the compiler and publishes snapshots.
pub struct Supervisor {
    mode: Mode,
    compiler: Arc<dyn Compiler>,
    layout: ArtifactLayout,
    store: BundleStore,
    phase: watch::Sender<Phase>,
    // Serializes builds; the bundler writes into one directory
    build_lock: Mutex<()>,
}

impl Supervisor {
    pub fn new(mode: Mode, compiler: Arc<dyn Compiler>, layout: ArtifactLayout) -> Self {
        let (phase, _rx) = watch::channel(Phase::Compiling);
        Self {
            mode,
            compiler,
            layout,
            store: BundleStore::new(),
            phase,
            build_lock: Mutex::new(()),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    pub fn store(&self) -> &BundleStore {
        &self.store
    }

    pub fn phase(&self) -> Phase {
        self.phase.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    /// Most recent successful snapshot; never blocks.
    pub fn current(&self) -> Option<Arc<BundleSnapshot>> {
        self.store.current()
    }

    /// Produce the first snapshot.
    ///
    /// Development always compiles. Production reuses artifacts left by a
    /// previous build and only compiles when they are missing.
    pub async fn start(&self) -> Result<Published, BuildError> {
        let _guard = self.build_lock.lock().await;

        if self.mode == Mode::Production && self.layout.exists() {
            tracing::info!(
                "Using pre-built artifacts in {}",
                self.layout.build_dir.display()
            );
            self.set_phase(Phase::Compiling);
            return self.publish(None).await;
        }

        self.build().await
    }

    /// Rebuild after a source change. Development only.
    pub async fn recompile(&self) -> Result<Published, BuildError> {
        if self.mode == Mode::Production {
            return Err(BuildError::Frozen);
        }

        let _guard = self.build_lock.lock().await;
        self.build().await
    }

    /// Wait until the phase is `Ready` and return the current snapshot.
    ///
    /// Returns `None` if the last build failed.
    pub async fn wait_ready(&self) -> Option<Arc<BundleSnapshot>> {
        let mut rx = self.phase.subscribe();
        let ready = rx
            .wait_for(|phase| !matches!(phase, Phase::Compiling))
            .await
            .ok()?
            .is_ready();

        if ready {
            self.store.current()
        } else {
            None
        }
    }

    async fn build(&self) -> Result<Published, BuildError> {
        self.set_phase(Phase::Compiling);

        let report = match self.compiler.compile().await {
            Ok(report) => report,
            Err(e) => {
                self.set_phase(Phase::Failed(e.to_string()));
                return Err(e);
            }
        };
        tracing::debug!("Build finished in {}ms", report.duration_ms);
        if !report.output.is_empty() {
            tracing::debug!("Build output:\n{}", report.output);
        }

        self.publish(Some(report)).await
    }

    async fn publish(&self, report: Option<CompileReport>) -> Result<Published, BuildError> {
        let (artifacts, assets) = match self.layout.load().await {
            Ok(loaded) => loaded,
            Err(e) => {
                self.set_phase(Phase::Failed(e.to_string()));
                return Err(e);
            }
        };

        let snapshot = self.store.publish(artifacts, assets);
        self.set_phase(Phase::Ready);
        Ok(Published { snapshot, report })
    }

    fn set_phase(&self, phase: Phase) {
        tracing::debug!("Supervisor phase: {:?}", phase);
        self.phase.send_replace(phase);
    }
}

impl fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("mode", &self.mode)
            .field("layout", &self.layout)
            .field("phase", &*self.phase.borrow())
            .field("generation", &self.store.generation())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{ArtifactKind, CLIENT_MANIFEST_FILE, SERVER_BUNDLE_FILE};
    use crate::bundle::Artifacts;
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Writes a bundle tagged with the build number.
    struct FakeCompiler {
        dir: PathBuf,
        builds: AtomicUsize,
        fail: bool,
        delay: Duration,
    }

    impl FakeCompiler {
        fn new(dir: &Path) -> Self {
            Self {
                dir: dir.to_path_buf(),
                builds: AtomicUsize::new(0),
                fail: false,
                delay: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl Compiler for FakeCompiler {
        async fn compile(&self) -> Result<CompileReport, BuildError> {
            let build = self.builds.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(BuildError::Failed {
                    code: 1,
                    diagnostics: "SyntaxError: Unexpected token".to_string(),
                });
            }
            write_bundle(&self.dir, build);
            Ok(CompileReport {
                duration_ms: 1,
                output: String::new(),
            })
        }
    }

    fn write_bundle(dir: &Path, build: usize) {
        std::fs::write(
            dir.join(SERVER_BUNDLE_FILE),
            format!(r#"{{"entry":"main.js","build":{}}}"#, build),
        )
        .unwrap();
        std::fs::write(dir.join(CLIENT_MANIFEST_FILE), r#"{"initial":[],"all":[]}"#).unwrap();
    }

    fn build_number(snapshot: &BundleSnapshot) -> u64 {
        match &snapshot.artifacts {
            Artifacts::Bundle { server_bundle, .. } => server_bundle["build"].as_u64().unwrap(),
            other => panic!("unexpected artifacts: {:?}", other),
        }
    }

    fn supervisor(mode: Mode, compiler: Arc<FakeCompiler>, dir: &Path) -> Supervisor {
        Supervisor::new(
            mode,
            compiler,
            ArtifactLayout::new(ArtifactKind::Bundle, dir, dir),
        )
    }

    #[test]
    fn test_mode_from_node_env() {
        assert_eq!(
            Mode::from_node_env(Some("development"), Mode::Production),
            Mode::Development
        );
        assert_eq!(
            Mode::from_node_env(Some("test"), Mode::Development),
            Mode::Production
        );
        assert_eq!(Mode::from_node_env(None, Mode::Development), Mode::Development);
        assert_eq!(Mode::from_node_env(Some(""), Mode::Production), Mode::Production);
        assert_eq!(Mode::Development.to_string(), "development");
    }

    #[tokio::test]
    async fn test_development_start_and_recompile() {
        let temp = TempDir::new().unwrap();
        let compiler = Arc::new(FakeCompiler::new(temp.path()));
        let supervisor = supervisor(Mode::Development, Arc::clone(&compiler), temp.path());

        assert_eq!(supervisor.phase(), Phase::Compiling);
        assert!(supervisor.current().is_none());

        let first = supervisor.start().await.unwrap();
        assert_eq!(first.snapshot.generation, 1);
        assert!(first.report.is_some());
        assert_eq!(supervisor.phase(), Phase::Ready);

        let second = supervisor.recompile().await.unwrap();
        assert_eq!(second.snapshot.generation, 2);
        assert_eq!(build_number(&second.snapshot), 2);
        assert_eq!(compiler.builds.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_production_reuses_prebuilt_artifacts() {
        let temp = TempDir::new().unwrap();
        write_bundle(temp.path(), 7);
        let compiler = Arc::new(FakeCompiler::new(temp.path()));
        let supervisor = supervisor(Mode::Production, Arc::clone(&compiler), temp.path());

        let published = supervisor.start().await.unwrap();
        assert!(published.report.is_none());
        assert_eq!(build_number(&published.snapshot), 7);
        assert_eq!(compiler.builds.load(Ordering::SeqCst), 0);

        let err = supervisor.recompile().await.unwrap_err();
        assert!(matches!(err, BuildError::Frozen));
        assert_eq!(supervisor.phase(), Phase::Ready);
    }

    #[tokio::test]
    async fn test_production_builds_when_missing() {
        let temp = TempDir::new().unwrap();
        let compiler = Arc::new(FakeCompiler::new(temp.path()));
        let supervisor = supervisor(Mode::Production, Arc::clone(&compiler), temp.path());

        let published = supervisor.start().await.unwrap();
        assert_eq!(build_number(&published.snapshot), 1);
        assert_eq!(compiler.builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_build() {
        let temp = TempDir::new().unwrap();
        let mut compiler = FakeCompiler::new(temp.path());
        compiler.fail = true;
        let supervisor = supervisor(Mode::Development, Arc::new(compiler), temp.path());

        let err = supervisor.start().await.unwrap_err();
        assert!(matches!(err, BuildError::Failed { code: 1, .. }));
        assert!(matches!(supervisor.phase(), Phase::Failed(_)));
        assert!(supervisor.wait_ready().await.is_none());
    }

    #[tokio::test]
    async fn test_wait_ready_blocks_during_compile() {
        let temp = TempDir::new().unwrap();
        let mut compiler = FakeCompiler::new(temp.path());
        compiler.delay = Duration::from_millis(50);
        let supervisor = Arc::new(supervisor(
            Mode::Development,
            Arc::new(compiler),
            temp.path(),
        ));

        let waiter = {
            let supervisor = Arc::clone(&supervisor);
            tokio::spawn(async move { supervisor.wait_ready().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        supervisor.start().await.unwrap();
        let snapshot = tokio::time::timeout(Duration::from_secs(2), waiter)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.generation, 1);
    }
}
