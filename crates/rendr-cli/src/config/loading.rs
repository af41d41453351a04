use crate::cli::{BackendKind, ServeArgs};
use crate::config::{BackendEnv, EnvConfig, GlobalEnv, ServerConfig};
use crate::error::ConfigError;
use figment::{providers::Env, Figment};

/// Unprefixed variables read for every backend.
const GLOBAL_VARS: [&str; 4] = ["NODE_ENV", "NODE_PORT", "PORT", "HOST"];

impl EnvConfig {
    /// Read the global variables plus the backend's prefixed ones.
    pub fn load(backend: BackendKind) -> Result<Self, ConfigError> {
        let global: GlobalEnv = Figment::from(Env::raw().only(&GLOBAL_VARS)).extract()?;
        let backend: BackendEnv =
            Figment::from(Env::prefixed(backend.env_prefix())).extract()?;

        Ok(Self { global, backend })
    }
}

impl ServerConfig {
    /// Load and validate configuration for `backend` from the process
    /// environment, applying CLI overrides.
    pub fn load(backend: BackendKind, args: &ServeArgs) -> Result<Self, ConfigError> {
        let env = EnvConfig::load(backend)?;
        let cwd = std::env::current_dir().map_err(|e| ConfigError::InvalidValue {
            var: "ROOT_DIR".to_string(),
            value: ".".to_string(),
            hint: format!("Current directory is not accessible: {}", e),
        })?;

        let config = Self::resolve(backend, env, args, &cwd)?;
        tracing::debug!("Resolved configuration: {:?}", config);
        Ok(config)
    }
}
