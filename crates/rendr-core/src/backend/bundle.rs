//! Routed single-page-app backend.
//!
//! The framework's bundle renderer takes the compiled server bundle, the client
//! manifest and a context object, and returns the whole app as one HTML string.

use super::{RenderBackend, RenderWorker};
use crate::bundle::{Artifacts, BundleSnapshot};
use crate::compose::{escape_attr, AssetBase};
use crate::context::{RenderContext, RenderResult};
use crate::error::RenderError;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BundleRequest<'a> {
    server_bundle: &'a Value,
    client_manifest: &'a Value,
    context: Value,
}

/// Renders through a server bundle + client manifest pair.
#[derive(Debug, Clone)]
pub struct BundleBackend {
    worker: RenderWorker,
    context_key: String,
}

impl BundleBackend {
    pub fn new(worker: RenderWorker, context_key: impl Into<String>) -> Self {
        Self {
            worker,
            context_key: context_key.into(),
        }
    }

    /// Initial client files listed in the manifest with the given extension.
    pub fn initial_files<'a>(client_manifest: &'a Value, extension: &str) -> Vec<&'a str> {
        client_manifest
            .get("initial")
            .and_then(Value::as_array)
            .map(|files| {
                files
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|file| file.ends_with(extension))
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn client_manifest(snapshot: &BundleSnapshot) -> Option<&Value> {
    match &snapshot.artifacts {
        Artifacts::Bundle {
            client_manifest, ..
        } => Some(client_manifest),
        Artifacts::Modules { .. } => None,
    }
}

#[async_trait]
impl RenderBackend for BundleBackend {
    fn name(&self) -> &'static str {
        "routed"
    }

    fn selector_param(&self) -> &'static str {
        "template"
    }

    fn requires_layout(&self) -> bool {
        false
    }

    async fn render(
        &self,
        context: &RenderContext,
        snapshot: &BundleSnapshot,
    ) -> Result<RenderResult, RenderError> {
        let Artifacts::Bundle {
            server_bundle,
            client_manifest,
        } = &snapshot.artifacts
        else {
            return Err(RenderError::IncompatibleSnapshot {
                expected: "server bundle",
            });
        };

        let request = BundleRequest {
            server_bundle,
            client_manifest,
            context: context.to_framework_context(&self.context_key),
        };

        self.worker.render(&request).await
    }

    fn head_tags(&self, snapshot: &BundleSnapshot, assets: &AssetBase) -> String {
        client_manifest(snapshot)
            .map(|manifest| Self::initial_files(manifest, ".css"))
            .unwrap_or_default()
            .into_iter()
            .map(|file| {
                format!(
                    r#"<link rel="stylesheet" href="{}">"#,
                    escape_attr(&assets.url(file))
                )
            })
            .collect()
    }

    fn client_script(
        &self,
        _context: &RenderContext,
        snapshot: &BundleSnapshot,
        assets: &AssetBase,
    ) -> String {
        let mut tags = String::new();

        if let Some(manifest) = client_manifest(snapshot) {
            for file in Self::initial_files(manifest, ".js") {
                tags.push_str(&format!(
                    r#"<script src="{}" defer></script>"#,
                    escape_attr(&assets.url(file))
                ));
            }
        }

        if let Some(reload) = assets.reload_tag() {
            tags.push_str(&reload);
        }
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetCache;
    use crate::command::CommandLine;
    use serde_json::json;
    use std::time::SystemTime;

    fn snapshot() -> BundleSnapshot {
        BundleSnapshot {
            generation: 1,
            artifacts: Artifacts::Bundle {
                server_bundle: json!({ "entry": "server.js", "files": {} }),
                client_manifest: json!({
                    "publicPath": "/",
                    "initial": ["manifest.js", "cvue.client.js", "app.css"],
                    "all": ["manifest.js", "cvue.client.js", "app.css"]
                }),
            },
            assets: AssetCache::new(),
            compiled_at: SystemTime::now(),
        }
    }

    fn backend() -> BundleBackend {
        BundleBackend::new(
            RenderWorker::new(CommandLine::parse("node worker.mjs").unwrap()),
            "context",
        )
    }

    #[test]
    fn test_initial_files() {
        let snapshot = snapshot();
        let manifest = client_manifest(&snapshot).unwrap();
        assert_eq!(
            BundleBackend::initial_files(manifest, ".js"),
            vec!["manifest.js", "cvue.client.js"]
        );
        assert_eq!(BundleBackend::initial_files(manifest, ".css"), vec!["app.css"]);
        assert!(BundleBackend::initial_files(&json!({}), ".js").is_empty());
    }

    #[test]
    fn test_head_tags_link_initial_styles() {
        let assets = AssetBase::Static {
            public_path: "/dist".to_string(),
        };
        assert_eq!(
            backend().head_tags(&snapshot(), &assets),
            r#"<link rel="stylesheet" href="/dist/app.css">"#
        );
    }

    #[test]
    fn test_client_script_production() {
        let ctx = RenderContext::new("/", json!({}));
        let assets = AssetBase::Static {
            public_path: "/dist".to_string(),
        };
        let script = backend().client_script(&ctx, &snapshot(), &assets);

        assert_eq!(
            script,
            r#"<script src="/dist/manifest.js" defer></script><script src="/dist/cvue.client.js" defer></script>"#
        );
    }

    #[test]
    fn test_client_script_development() {
        let ctx = RenderContext::new("/", json!({}));
        let assets = AssetBase::Dev {
            origin: "http://localhost:4000".to_string(),
            public_path: "/".to_string(),
        };
        let script = backend().client_script(&ctx, &snapshot(), &assets);

        assert!(script.contains(r#"src="http://localhost:4000/cvue.client.js""#));
        assert!(script.ends_with(r#"<script src="http://localhost:4000/__rendr_reload__.js"></script>"#));
    }

    #[tokio::test]
    async fn test_render_rejects_module_snapshot() {
        let mut snapshot = snapshot();
        snapshot.artifacts = Artifacts::Modules {
            server_root: "build/server".into(),
        };
        let ctx = RenderContext::new("/", json!({}));

        let err = backend().render(&ctx, &snapshot).await.unwrap_err();
        assert!(matches!(err, RenderError::IncompatibleSnapshot { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_render_through_worker() {
        let worker = RenderWorker::new(CommandLine {
            program: "sh".to_string(),
            args: vec![
                "-c".to_string(),
                r#"cat > /dev/null; printf '{"html":"<div id=\"app\">home</div>","head":"<script>window.__INITIAL_STATE__={}</script>","css":"p{}"}'"#
                    .to_string(),
            ],
            cwd: None,
            env: Vec::new(),
        });
        let backend = BundleBackend::new(worker, "context");
        let ctx = RenderContext::new("/home", json!({ "user": "ada" }));

        let result = backend.render(&ctx, &snapshot()).await.unwrap();
        assert_eq!(result.html, r#"<div id="app">home</div>"#);
        assert_eq!(result.head, "<script>window.__INITIAL_STATE__={}</script>");
        assert_eq!(result.css.as_deref(), Some("p{}"));
    }
}
