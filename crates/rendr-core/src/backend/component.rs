//! Compiled-component backend.
//!
//! Each request path maps to one compiled server module under the snapshot's
//! server root. The worker imports that module, renders it with the request
//! props and returns `{html, head, css}`.

use super::{RenderBackend, RenderWorker};
use crate::bundle::{Artifacts, BundleSnapshot};
use crate::compose::{script_json, AssetBase};
use crate::context::{RenderContext, RenderResult};
use crate::error::RenderError;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Component, Path, PathBuf};

/// Default element the client hydrates into.
pub const DEFAULT_MOUNT_SELECTOR: &str = "#rendr-app";

#[derive(Serialize)]
struct ComponentRequest<'a> {
    module: &'a Path,
    props: Value,
}

/// Renders compiled component modules.
#[derive(Debug, Clone)]
pub struct ComponentBackend {
    worker: RenderWorker,
    context_key: String,
    mount_selector: String,
}

impl ComponentBackend {
    pub fn new(worker: RenderWorker, context_key: impl Into<String>) -> Self {
        Self {
            worker,
            context_key: context_key.into(),
            mount_selector: DEFAULT_MOUNT_SELECTOR.to_string(),
        }
    }

    /// Hydrate into the element matching `selector` instead of the default.
    pub fn with_mount_selector(mut self, selector: impl Into<String>) -> Self {
        self.mount_selector = selector.into();
        self
    }

    fn props(&self, payload: &Value) -> Value {
        let mut props = Map::new();
        props.insert(self.context_key.clone(), payload.clone());
        Value::Object(props)
    }
}

/// Map a request path to a compiled module under `server_root`.
///
/// `/` and trailing slashes resolve to `index`; `..` segments are rejected.
/// The module must exist on disk.
pub fn module_path(server_root: &Path, pathname: &str) -> Result<PathBuf, RenderError> {
    let trimmed = pathname.trim_matches('/');
    let relative = if trimmed.is_empty() {
        PathBuf::from("index")
    } else if pathname.ends_with('/') {
        Path::new(trimmed).join("index")
    } else {
        PathBuf::from(trimmed)
    };

    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(RenderError::InvalidPath(pathname.to_string()));
    }

    let mut module = server_root.join(relative);
    let file_name = module
        .file_name()
        .map(|name| format!("{}.js", name.to_string_lossy()))
        .ok_or_else(|| RenderError::InvalidPath(pathname.to_string()))?;
    module.set_file_name(file_name);

    if !module.is_file() {
        return Err(RenderError::ModuleNotFound(module));
    }
    Ok(module)
}

#[async_trait]
impl RenderBackend for ComponentBackend {
    fn name(&self) -> &'static str {
        "component"
    }

    fn selector_param(&self) -> &'static str {
        "layout"
    }

    fn requires_layout(&self) -> bool {
        true
    }

    async fn render(
        &self,
        context: &RenderContext,
        snapshot: &BundleSnapshot,
    ) -> Result<RenderResult, RenderError> {
        let Artifacts::Modules { server_root } = &snapshot.artifacts else {
            return Err(RenderError::IncompatibleSnapshot {
                expected: "component module",
            });
        };

        let module = module_path(server_root, &context.pathname)?;
        tracing::debug!("Rendering {} for {}", module.display(), context.pathname);

        let request = ComponentRequest {
            module: &module,
            props: self.props(&context.payload),
        };
        self.worker.render(&request).await
    }

    fn client_script(
        &self,
        context: &RenderContext,
        _snapshot: &BundleSnapshot,
        assets: &AssetBase,
    ) -> String {
        let pathname = match context.pathname.trim_end_matches('/') {
            "" => "/index".to_string(),
            path if context.pathname.ends_with('/') => format!("{}/index", path),
            path => path.to_string(),
        };
        let entry = assets.url(&format!("{}.js", pathname));

        let mut script = format!(
            r#"<script type="module">
import App from {entry};
new App({{
  target: document.querySelector({target}),
  hydrate: true,
  props: {props}
}});
</script>"#,
            entry = script_json(&Value::String(entry)),
            target = script_json(&Value::String(self.mount_selector.clone())),
            props = script_json(&self.props(&context.payload)),
        );

        if let Some(reload) = assets.reload_tag() {
            script.push_str(&reload);
        }
        script
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetCache;
    use crate::command::CommandLine;
    use serde_json::json;
    use std::fs;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn server_root() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.js"), "export default {}").unwrap();
        fs::write(dir.path().join("about.js"), "export default {}").unwrap();
        fs::create_dir(dir.path().join("blog")).unwrap();
        fs::write(dir.path().join("blog/index.js"), "export default {}").unwrap();
        fs::write(dir.path().join("blog/post.js"), "export default {}").unwrap();
        dir
    }

    fn snapshot(root: &Path) -> BundleSnapshot {
        BundleSnapshot {
            generation: 4,
            artifacts: Artifacts::Modules {
                server_root: root.to_path_buf(),
            },
            assets: AssetCache::new(),
            compiled_at: SystemTime::now(),
        }
    }

    #[test]
    fn test_module_path_resolution() {
        let root = server_root();
        let root = root.path();

        assert_eq!(module_path(root, "/").unwrap(), root.join("index.js"));
        assert_eq!(module_path(root, "/about").unwrap(), root.join("about.js"));
        assert_eq!(module_path(root, "/blog/").unwrap(), root.join("blog/index.js"));
        assert_eq!(
            module_path(root, "/blog/post").unwrap(),
            root.join("blog/post.js")
        );
    }

    #[test]
    fn test_module_path_rejects_traversal() {
        let root = server_root();
        let err = module_path(root.path(), "/../secrets").unwrap_err();
        assert!(matches!(err, RenderError::InvalidPath(_)));

        let err = module_path(root.path(), "/blog/../../x").unwrap_err();
        assert!(matches!(err, RenderError::InvalidPath(_)));
    }

    #[test]
    fn test_module_path_missing() {
        let root = server_root();
        let err = module_path(root.path(), "/contact").unwrap_err();
        assert!(matches!(err, RenderError::ModuleNotFound(_)));
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_client_script_escapes_payload() {
        let backend = ComponentBackend::new(
            RenderWorker::new(CommandLine::parse("node worker.mjs").unwrap()),
            "context",
        );
        let root = server_root();
        let ctx = RenderContext::new("/about", json!({ "note": "</script>" }));
        let assets = AssetBase::Static {
            public_path: "/".to_string(),
        };

        let script = backend.client_script(&ctx, &snapshot(root.path()), &assets);
        assert!(script.starts_with(r#"<script type="module">"#));
        assert!(script.contains(r#"import App from "/about.js";"#));
        assert!(script.contains(r##"document.querySelector("#rendr-app")"##));
        assert!(script.contains("hydrate: true"));
        assert!(script.contains(r#"props: {"context":{"note":"\u003c/script\u003e"}}"#));
        assert_eq!(script.matches("</script>").count(), 1);
    }

    #[test]
    fn test_client_script_index_in_development() {
        let backend = ComponentBackend::new(
            RenderWorker::new(CommandLine::parse("node worker.mjs").unwrap()),
            "props",
        );
        let root = server_root();
        let ctx = RenderContext::new("/", json!({}));
        let assets = AssetBase::Dev {
            origin: "http://localhost:4000".to_string(),
            public_path: "/".to_string(),
        };

        let script = backend.client_script(&ctx, &snapshot(root.path()), &assets);
        assert!(script.contains(r#"import App from "http://localhost:4000/index.js";"#));
        assert!(script.contains(r#"props: {"props":{}}"#));
        assert!(script.contains("__rendr_reload__.js"));
    }

    #[test]
    fn test_client_script_custom_mount() {
        let backend = ComponentBackend::new(
            RenderWorker::new(CommandLine::parse("node worker.mjs").unwrap()),
            "context",
        )
        .with_mount_selector("#celestite-server-rendered");
        let root = server_root();
        let ctx = RenderContext::new("/", json!({}));
        let assets = AssetBase::Static {
            public_path: "/".to_string(),
        };

        let script = backend.client_script(&ctx, &snapshot(root.path()), &assets);
        assert!(script.contains(r##"document.querySelector("#celestite-server-rendered")"##));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_render_sends_module_and_props() {
        // Reply with the request itself as the html so the test can inspect it
        let worker = RenderWorker::new(CommandLine {
            program: "sh".to_string(),
            args: vec![
                "-c".to_string(),
                r#"printf '{"html":%s,"head":"<title>About</title>","css":{"code":"p{}"}}' "$(cat | sed 's/\\/\\\\/g; s/"/\\"/g; s/^/"/; s/$/"/')""#
                    .to_string(),
            ],
            cwd: None,
            env: Vec::new(),
        });
        let backend = ComponentBackend::new(worker, "context");
        let root = server_root();
        let ctx = RenderContext::new("/about", json!({ "user": "ada" }));

        let result = backend.render(&ctx, &snapshot(root.path())).await.unwrap();
        let request: Value = serde_json::from_str(&result.html).unwrap();

        assert_eq!(
            request["module"],
            json!(root.path().join("about.js").to_string_lossy())
        );
        assert_eq!(request["props"], json!({ "context": { "user": "ada" } }));
        assert_eq!(result.head, "<title>About</title>");
        assert_eq!(result.css.as_deref(), Some("p{}"));
    }

    #[tokio::test]
    async fn test_render_rejects_bundle_snapshot() {
        let backend = ComponentBackend::new(
            RenderWorker::new(CommandLine::parse("node worker.mjs").unwrap()),
            "context",
        );
        let snapshot = BundleSnapshot {
            generation: 1,
            artifacts: Artifacts::Bundle {
                server_bundle: json!({}),
                client_manifest: json!({}),
            },
            assets: AssetCache::new(),
            compiled_at: SystemTime::now(),
        };
        let err = backend
            .render(&RenderContext::new("/", json!({})), &snapshot)
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::IncompatibleSnapshot { .. }));
    }
}
