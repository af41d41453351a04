use crate::cli::{BackendKind, ServeArgs};
use crate::config::{
    EnvConfig, EnvValue, ServerConfig, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_PUBLIC_PATH,
    DEFAULT_RENDER_COMMAND,
};
use crate::error::ConfigError;
use rendr_core::backend::{DEFAULT_CONTEXT_KEY, DEFAULT_MOUNT_SELECTOR};
use rendr_core::{CommandLine, Markers, Mode};
use std::path::{Path, PathBuf};

/// Non-empty text of an optional value.
fn text(value: &Option<EnvValue>) -> Option<String> {
    value
        .as_ref()
        .map(|v| v.to_string().trim().to_string())
        .filter(|v| !v.is_empty())
}

fn resolve_path(base: &Path, value: &str) -> PathBuf {
    let path = Path::new(value);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Parse a port variable.
pub fn parse_port(var: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
        var: var.to_string(),
        value: value.to_string(),
        hint: "Use a port number between 0 and 65535".to_string(),
    })
}

/// Make a public path absolute unless it is a full URL.
pub fn normalize_public_path(value: &str) -> String {
    if value.contains("://") || value.starts_with('/') {
        value.to_string()
    } else {
        format!("/{}", value)
    }
}

impl ServerConfig {
    /// Validate raw values into a typed configuration.
    ///
    /// Relative paths resolve against the root directory, which itself
    /// resolves against `cwd`.
    pub fn resolve(
        backend: BackendKind,
        env: EnvConfig,
        args: &ServeArgs,
        cwd: &Path,
    ) -> Result<Self, ConfigError> {
        let prefix = backend.env_prefix();
        let var = |name: &str| format!("{}{}", prefix, name);
        let vars = &env.backend;

        let default_mode = match backend {
            BackendKind::Routed => Mode::Development,
            BackendKind::Component => Mode::Production,
        };
        let mode = Mode::from_node_env(text(&env.global.node_env).as_deref(), default_mode);

        let port = match (args.port, text(&env.global.node_port), text(&env.global.port)) {
            (Some(port), _, _) => port,
            (None, Some(value), _) => parse_port("NODE_PORT", &value)?,
            (None, None, Some(value)) => parse_port("PORT", &value)?,
            (None, None, None) => DEFAULT_PORT,
        };
        let host = args
            .host
            .clone()
            .or_else(|| text(&env.global.host))
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let root_dir = text(&vars.root_dir)
            .map(|dir| resolve_path(cwd, &dir))
            .unwrap_or_else(|| cwd.to_path_buf());

        let component_dir = text(&vars.component_dir)
            .map(|dir| resolve_path(&root_dir, &dir))
            .ok_or_else(|| ConfigError::MissingVar {
                var: var("COMPONENT_DIR"),
                hint: "Set it to the directory holding your components".to_string(),
            })?;

        let routes_file = match backend {
            BackendKind::Routed => Some(
                text(&vars.routes_file)
                    .map(|file| resolve_path(&root_dir, &file))
                    .ok_or_else(|| ConfigError::MissingVar {
                        var: var("ROUTES_FILE"),
                        hint: "Set it to the module exporting your routes".to_string(),
                    })?,
            ),
            BackendKind::Component => None,
        };

        // The two names are interchangeable
        let layout_dir = text(&vars.template_dir)
            .or_else(|| text(&vars.layout_dir))
            .map(|dir| resolve_path(&root_dir, &dir));

        let build_dir = text(&vars.build_dir)
            .map(|dir| resolve_path(&root_dir, &dir))
            .unwrap_or_else(|| root_dir.join("build"));
        let client_build_dir = text(&vars.client_build_dir)
            .map(|dir| resolve_path(&root_dir, &dir))
            .unwrap_or_else(|| build_dir.clone());

        let public_path = text(&vars.client_build_dir_public_path)
            .map(|path| normalize_public_path(&path))
            .unwrap_or_else(|| DEFAULT_PUBLIC_PATH.to_string());

        let context_key =
            text(&vars.context_key).unwrap_or_else(|| DEFAULT_CONTEXT_KEY.to_string());

        let defaults = Markers::default();
        let markers = Markers {
            head: text(&vars.head_marker).unwrap_or(defaults.head),
            body: text(&vars.body_marker).unwrap_or(defaults.body),
            client: text(&vars.client_marker).unwrap_or(defaults.client),
        };
        let mount_selector =
            text(&vars.mount_selector).unwrap_or_else(|| DEFAULT_MOUNT_SELECTOR.to_string());

        if mode.is_development() && !component_dir.is_dir() {
            return Err(ConfigError::MissingPath {
                var: var("COMPONENT_DIR"),
                path: component_dir,
            });
        }

        let build_command = {
            let raw = text(&vars.build_command)
                .unwrap_or_else(|| backend.default_build_command().to_string());
            let mut command = CommandLine::parse(&raw)
                .ok_or_else(|| ConfigError::InvalidValue {
                    var: var("BUILD_COMMAND"),
                    value: raw.clone(),
                    hint: "Provide the bundler command, e.g. 'npx webpack'".to_string(),
                })?
                .with_cwd(&root_dir)
                .with_env("NODE_ENV", mode.node_env())
                .with_env(var("COMPONENT_DIR"), component_dir.to_string_lossy())
                .with_env(var("BUILD_DIR"), build_dir.to_string_lossy())
                .with_env(var("CLIENT_BUILD_DIR_PUBLIC_PATH"), public_path.as_str());
            if let Some(routes_file) = &routes_file {
                command = command.with_env(var("ROUTES_FILE"), routes_file.to_string_lossy());
            }
            command
        };

        let render_command = {
            let raw = text(&vars.render_command)
                .unwrap_or_else(|| DEFAULT_RENDER_COMMAND.to_string());
            CommandLine::parse(&raw)
                .ok_or_else(|| ConfigError::InvalidValue {
                    var: var("RENDER_COMMAND"),
                    value: raw.clone(),
                    hint: "Provide the render worker command, e.g. 'node render-worker.mjs'"
                        .to_string(),
                })?
                .with_cwd(&root_dir)
                .with_env("NODE_ENV", mode.node_env())
        };

        Ok(Self {
            backend,
            mode,
            host,
            port,
            root_dir,
            component_dir,
            routes_file,
            layout_dir,
            build_dir,
            client_build_dir,
            public_path,
            build_command,
            render_command,
            context_key,
            markers,
            mount_selector,
        })
    }
}
