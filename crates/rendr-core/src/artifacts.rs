//! Reading bundler output from disk.

use crate::assets::AssetCache;
use crate::bundle::Artifacts;
use crate::error::BuildError;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Server bundle descriptor written by the routed bundler.
pub const SERVER_BUNDLE_FILE: &str = "vue-ssr-server-bundle.json";

/// Client manifest written by the routed bundler.
pub const CLIENT_MANIFEST_FILE: &str = "vue-ssr-client-manifest.json";

/// Shape of the bundler's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// `<build>/vue-ssr-server-bundle.json` + `<build>/vue-ssr-client-manifest.json`
    Bundle,
    /// `<build>/server/**.js` + `<build>/client/*`
    Modules,
}

/// Where a build writes its output and where client assets end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    pub kind: ArtifactKind,
    pub build_dir: PathBuf,
    pub client_dir: PathBuf,
}

impl ArtifactLayout {
    pub fn new(kind: ArtifactKind, build_dir: impl Into<PathBuf>, client_dir: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            build_dir: build_dir.into(),
            client_dir: client_dir.into(),
        }
    }

    /// Files (or directories) that must exist for the build to be usable.
    pub fn required_paths(&self) -> Vec<PathBuf> {
        match self.kind {
            ArtifactKind::Bundle => vec![
                self.build_dir.join(SERVER_BUNDLE_FILE),
                self.build_dir.join(CLIENT_MANIFEST_FILE),
            ],
            ArtifactKind::Modules => vec![self.server_root()],
        }
    }

    /// Directory of compiled server modules (component builds).
    pub fn server_root(&self) -> PathBuf {
        self.build_dir.join("server")
    }

    /// Directory the client assets are read from after a build.
    pub fn asset_source_dir(&self) -> PathBuf {
        match self.kind {
            ArtifactKind::Bundle => self.build_dir.clone(),
            ArtifactKind::Modules => self.build_dir.join("client"),
        }
    }

    /// Whether a previous build left usable artifacts behind.
    pub fn exists(&self) -> bool {
        self.required_paths().iter().all(|path| path.exists())
    }

    /// Load artifacts and client assets produced by the last build.
    pub async fn load(&self) -> Result<(Artifacts, AssetCache), BuildError> {
        for path in self.required_paths() {
            if !path.exists() {
                return Err(BuildError::MissingArtifact(path));
            }
        }

        let artifacts = match self.kind {
            ArtifactKind::Bundle => {
                let server_bundle = read_json(&self.build_dir.join(SERVER_BUNDLE_FILE)).await?;
                let client_manifest =
                    read_json(&self.build_dir.join(CLIENT_MANIFEST_FILE)).await?;
                if self.client_dir != self.build_dir {
                    self.link_client_assets(&client_manifest).await?;
                }
                Artifacts::Bundle {
                    server_bundle,
                    client_manifest,
                }
            }
            ArtifactKind::Modules => Artifacts::Modules {
                server_root: self.server_root(),
            },
        };

        let assets = AssetCache::load_dir(&self.asset_source_dir()).await?;
        tracing::debug!("Loaded {} client assets", assets.len());

        Ok((artifacts, assets))
    }

    /// Symlink every client file listed in the manifest's `all` list into
    /// the client directory. Existing links are left alone.
    pub async fn link_client_assets(&self, client_manifest: &Value) -> Result<usize, BuildError> {
        let files = client_manifest
            .get("all")
            .and_then(Value::as_array)
            .map(|files| files.iter().filter_map(Value::as_str).collect::<Vec<_>>())
            .unwrap_or_default();

        tokio::fs::create_dir_all(&self.client_dir).await?;

        let mut linked = 0;
        for file in files {
            // Manifest entries are relative to the build output
            let relative = Path::new(file.trim_start_matches('/'));
            if relative
                .components()
                .any(|c| !matches!(c, std::path::Component::Normal(_)))
            {
                tracing::warn!("Skipping client asset outside the build dir: {}", file);
                continue;
            }

            let source = self.build_dir.join(relative);
            let target = self.client_dir.join(relative);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }

            match symlink(&source, &target).await {
                Ok(()) => linked += 1,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    tracing::info!("Client asset already linked: {}", target.display());
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(linked)
    }
}

async fn read_json(path: &Path) -> Result<Value, BuildError> {
    let bytes = tokio::fs::read(path).await?;
    serde_json::from_slice(&bytes).map_err(|source| BuildError::InvalidArtifact {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(unix)]
async fn symlink(source: &Path, target: &Path) -> std::io::Result<()> {
    tokio::fs::symlink(source, target).await
}

#[cfg(windows)]
async fn symlink(source: &Path, target: &Path) -> std::io::Result<()> {
    tokio::fs::symlink_file(source, target).await
}
