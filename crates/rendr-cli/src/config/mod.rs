//! Environment-driven configuration.
//!
//! Two layers:
//! - [`EnvConfig`]: raw values as found in the environment, extracted with
//!   figment from a few global variables plus the backend's prefixed ones
//! - [`ServerConfig`]: validated, typed settings with every path resolved
//!   against the root directory
//!
//! Priority: CLI flags > environment > defaults

mod loading;
mod validation;

use crate::cli::BackendKind;
use rendr_core::{
    ArtifactKind, ArtifactLayout, AssetBase, CommandLine, Markers, Mode, SupportError,
    SupportFiles,
};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

pub use validation::{normalize_public_path, parse_port};

pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PUBLIC_PATH: &str = "/";
pub const DEFAULT_RENDER_COMMAND: &str = "node render-worker.mjs";

/// An environment value.
///
/// The env provider types values it can parse (`4000` is an integer), so
/// string settings accept any scalar and use its text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for EnvValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvValue::Text(s) => f.write_str(s),
            EnvValue::Int(n) => write!(f, "{}", n),
            EnvValue::Float(n) => write!(f, "{}", n),
            EnvValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Unprefixed variables shared by both backends.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GlobalEnv {
    pub node_env: Option<EnvValue>,
    pub node_port: Option<EnvValue>,
    pub port: Option<EnvValue>,
    pub host: Option<EnvValue>,
}

/// Backend variables with the prefix stripped (`VUE_BUILD_DIR` -> `build_dir`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BackendEnv {
    pub component_dir: Option<EnvValue>,
    pub routes_file: Option<EnvValue>,
    pub template_dir: Option<EnvValue>,
    pub layout_dir: Option<EnvValue>,
    pub build_dir: Option<EnvValue>,
    pub client_build_dir: Option<EnvValue>,
    pub client_build_dir_public_path: Option<EnvValue>,
    pub root_dir: Option<EnvValue>,
    pub build_command: Option<EnvValue>,
    pub render_command: Option<EnvValue>,
    pub context_key: Option<EnvValue>,
    pub head_marker: Option<EnvValue>,
    pub body_marker: Option<EnvValue>,
    pub client_marker: Option<EnvValue>,
    pub mount_selector: Option<EnvValue>,
}

/// Raw configuration for one backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub global: GlobalEnv,
    pub backend: BackendEnv,
}

/// Validated settings for one backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub backend: BackendKind,
    pub mode: Mode,
    pub host: String,
    pub port: u16,
    /// Working directory for the bundler and render worker
    pub root_dir: PathBuf,
    pub component_dir: PathBuf,
    /// Routes module (routed backend only)
    pub routes_file: Option<PathBuf>,
    pub layout_dir: Option<PathBuf>,
    pub build_dir: PathBuf,
    pub client_build_dir: PathBuf,
    /// URL prefix the browser loads client assets from
    pub public_path: String,
    pub build_command: CommandLine,
    pub render_command: CommandLine,
    /// Key the request payload is exposed under
    pub context_key: String,
    /// Comment tokens layouts mark their regions with
    pub markers: Markers,
    /// Element component pages hydrate into
    pub mount_selector: String,
}

impl ServerConfig {
    /// Address to bind, `host:port`.
    pub fn address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Full name of one of this backend's variables.
    pub fn var(&self, name: &str) -> String {
        format!("{}{}", self.backend.env_prefix(), name)
    }

    /// Where the bundler writes and where client files end up.
    pub fn artifact_layout(&self) -> ArtifactLayout {
        let kind = match self.backend {
            BackendKind::Routed => ArtifactKind::Bundle,
            BackendKind::Component => ArtifactKind::Modules,
        };
        ArtifactLayout::new(kind, &self.build_dir, &self.client_build_dir)
    }

    /// How composed pages reference client bundles.
    ///
    /// `port` is the port actually bound, which differs from the configured
    /// one when binding port 0.
    pub fn asset_base(&self, port: u16) -> AssetBase {
        match self.mode {
            Mode::Development => AssetBase::Dev {
                origin: format!("http://localhost:{}", port),
                public_path: self.public_path.clone(),
            },
            Mode::Production => AssetBase::Static {
                public_path: self.public_path.clone(),
            },
        }
    }

    /// Paths the development watcher observes.
    pub fn watch_paths(&self) -> Vec<PathBuf> {
        let mut paths = vec![self.component_dir.clone()];
        if let Some(parent) = self.routes_file.as_ref().and_then(|f| f.parent()) {
            if !paths.iter().any(|p| parent.starts_with(p)) {
                paths.push(parent.to_path_buf());
            }
        }
        paths
    }

    /// Read the layout directory, or nothing when none is configured.
    pub fn load_layouts(&self) -> Result<SupportFiles, SupportError> {
        match &self.layout_dir {
            Some(dir) => SupportFiles::load(dir),
            None => Ok(SupportFiles::empty()),
        }
    }
}
