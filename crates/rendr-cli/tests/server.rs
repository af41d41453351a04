//! HTTP listener tests against pre-built artifacts and a shell render worker.
#![cfg(unix)]

use async_trait::async_trait;
use rendr_cli::server::{AppState, RenderServer, SharedState};
use rendr_core::{
    ArtifactKind, ArtifactLayout, AssetBase, BuildError, BundleBackend, CommandLine,
    CompileReport, Compiler, ComponentBackend, Mode, Pipeline, RenderBackend, RenderWorker,
    SupportFiles, Supervisor,
};
use serde_json::json;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;

const LAYOUT: &str =
    "<html><head><!--HEAD--></head><body><div id=\"rendr-app\"><!--BODY--></div><!--CLIENT--></body></html>";

/// Artifacts are already on disk; compiling is a no-op.
struct Prebuilt;

#[async_trait]
impl Compiler for Prebuilt {
    async fn compile(&self) -> Result<CompileReport, BuildError> {
        Ok(CompileReport {
            duration_ms: 1,
            output: String::new(),
        })
    }
}

struct Running {
    addr: SocketAddr,
    _shutdown: oneshot::Sender<()>,
    _dir: TempDir,
}

fn sh(script: &str) -> RenderWorker {
    RenderWorker::new(CommandLine {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        cwd: None,
        env: Vec::new(),
    })
}

fn write_bundle(dir: &Path) {
    fs::write(
        dir.join("vue-ssr-server-bundle.json"),
        json!({ "entry": "main.js", "files": { "main.js": "module.exports = {}" } }).to_string(),
    )
    .unwrap();
    fs::write(
        dir.join("vue-ssr-client-manifest.json"),
        json!({ "publicPath": "/", "initial": ["client.js", "app.css"], "all": ["client.js"] }).to_string(),
    )
    .unwrap();
    fs::write(dir.join("client.js"), "hydrate()").unwrap();
}

fn write_modules(dir: &Path) {
    fs::create_dir_all(dir.join("server")).unwrap();
    fs::create_dir_all(dir.join("client")).unwrap();
    fs::write(dir.join("server/index.js"), "export default {}").unwrap();
    fs::write(dir.join("client/index.js"), "export default {}").unwrap();
}

fn layouts(dir: &Path) -> SupportFiles {
    let layout_dir = dir.join("layouts");
    fs::create_dir_all(&layout_dir).unwrap();
    fs::write(layout_dir.join("main.html"), LAYOUT).unwrap();
    SupportFiles::load(&layout_dir).unwrap()
}

async fn start(
    kind: ArtifactKind,
    mode: Mode,
    backend: Arc<dyn RenderBackend>,
) -> Running {
    let dir = TempDir::new().unwrap();
    match kind {
        ArtifactKind::Bundle => write_bundle(dir.path()),
        ArtifactKind::Modules => write_modules(dir.path()),
    }
    let layouts = layouts(dir.path());

    let server = RenderServer::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap();

    let assets = match mode {
        Mode::Development => AssetBase::Dev {
            origin: format!("http://localhost:{}", addr.port()),
            public_path: "/".to_string(),
        },
        Mode::Production => AssetBase::Static {
            public_path: "/".to_string(),
        },
    };

    let supervisor = Arc::new(Supervisor::new(
        mode,
        Arc::new(Prebuilt),
        ArtifactLayout::new(kind, dir.path(), dir.path()),
    ));
    supervisor.start().await.unwrap();

    let state: SharedState = Arc::new(AppState::new(
        supervisor,
        Pipeline::new(backend, layouts, assets),
    ));

    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(server.serve(state, async move {
        let _ = rx.await;
    }));

    Running {
        addr,
        _shutdown: tx,
        _dir: dir,
    }
}

async fn routed(mode: Mode, script: &str) -> Running {
    let backend = Arc::new(BundleBackend::new(sh(script), "context"));
    start(ArtifactKind::Bundle, mode, backend).await
}

/// Send a raw request and return (status, headers + body).
async fn send(addr: SocketAddr, method: &str, target: &str, body: &str) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "{} {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        method,
        target,
        body.len(),
        body
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    let text = String::from_utf8_lossy(&response).to_string();
    let status = text
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .unwrap();
    (status, text)
}

const HELLO: &str = r#"cat > /dev/null; printf '{"html":"<h1>Hello</h1>"}'"#;

#[tokio::test]
async fn test_get_with_template() {
    let server = routed(Mode::Production, HELLO).await;

    let (status, response) = send(server.addr, "GET", "/home?template=main.html", "").await;

    assert_eq!(status, 200);
    assert!(response.contains("text/html"));
    assert!(response.contains(r#"<div id="rendr-app"><h1>Hello</h1></div>"#));
    assert!(response.contains(r#"<script src="/client.js" defer></script>"#));
    assert!(!response.contains("__rendr_reload__"));
}

#[tokio::test]
async fn test_routed_page_keeps_state_and_styles() {
    let server = routed(
        Mode::Production,
        r#"cat > /dev/null; printf '{"html":"<div>x</div>","head":"<script>window.__INITIAL_STATE__={}</script>"}'"#,
    )
    .await;

    let (status, response) = send(server.addr, "GET", "/?template=main.html", "").await;

    assert_eq!(status, 200);
    assert!(response.contains(
        r#"<head><link rel="stylesheet" href="/app.css"><script>window.__INITIAL_STATE__={}</script></head>"#
    ));
    assert!(!response.contains(r#"<script src="/app.css""#));
}

#[tokio::test]
async fn test_routed_without_template_is_bare() {
    let server = routed(Mode::Production, HELLO).await;

    let (status, response) = send(server.addr, "POST", "/home", r#"{"title":"x"}"#).await;

    assert_eq!(status, 200);
    assert!(response.ends_with("<h1>Hello</h1>"));
}

#[tokio::test]
async fn test_missing_template_is_request_scoped() {
    let server = routed(Mode::Production, HELLO).await;

    let (status, response) = send(server.addr, "POST", "/page?template=missing.html", "{}").await;
    assert_eq!(status, 500);
    assert!(response.ends_with("error: layout 'missing.html' not found"));

    // The listener is still up
    let (status, _) = send(server.addr, "GET", "/page?template=main.html", "").await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn test_malformed_body() {
    let server = routed(Mode::Production, HELLO).await;

    let (status, response) = send(server.addr, "POST", "/page", "{ nope").await;

    assert_eq!(status, 400);
    assert!(response.contains("error: invalid JSON context"));
}

#[tokio::test]
async fn test_method_not_allowed() {
    let server = routed(Mode::Production, HELLO).await;

    let (status, response) = send(server.addr, "PUT", "/page", "").await;

    assert_eq!(status, 405);
    assert!(response.to_lowercase().contains("allow: get, post"));
}

#[tokio::test]
async fn test_worker_failure() {
    let server = routed(
        Mode::Production,
        r#"cat > /dev/null; printf '{"error":{"message":"window is not defined","stack":"at render"}}'"#,
    )
    .await;

    let (status, response) = send(server.addr, "GET", "/?template=main.html", "").await;

    assert_eq!(status, 500);
    assert!(response.ends_with("error: window is not defined"));
}

#[tokio::test]
async fn test_dev_serves_assets_and_reload() {
    let server = routed(Mode::Development, HELLO).await;

    let (status, response) = send(server.addr, "GET", "/client.js", "").await;
    assert_eq!(status, 200);
    assert!(response.contains("application/javascript"));
    assert!(response.ends_with("hydrate()"));

    let (status, response) = send(server.addr, "GET", "/__rendr_reload__.js", "").await;
    assert_eq!(status, 200);
    assert!(response.contains("EventSource"));

    let (status, response) = send(server.addr, "GET", "/home?template=main.html", "").await;
    assert_eq!(status, 200);
    let origin = format!("http://localhost:{}", server.addr.port());
    assert!(response.contains(&format!(r#"<script src="{}/client.js" defer></script>"#, origin)));
    assert!(response.contains(&format!("{}/__rendr_reload__.js", origin)));
}

#[tokio::test]
async fn test_component_requires_layout() {
    let backend = Arc::new(ComponentBackend::new(
        sh(r#"cat > /dev/null; printf '{"html":"<main>Index</main>","head":"<title>Index</title>","css":null}'"#),
        "context",
    ));
    let server = start(ArtifactKind::Modules, Mode::Production, backend).await;

    let (status, response) = send(server.addr, "POST", "/", r#"{"user":"ada"}"#).await;
    assert_eq!(status, 500);
    assert!(response.contains("error: no layout requested, pass ?layout=<file>"));

    let (status, response) = send(server.addr, "POST", "/?layout=main.html", r#"{"user":"ada"}"#).await;
    assert_eq!(status, 200);
    assert!(response.contains("<head><title>Index</title></head>"));
    assert!(response.contains("<main>Index</main>"));
    assert!(response.contains("hydrate: true"));

    let (status, response) = send(server.addr, "GET", "/missing?layout=main.html", "").await;
    assert_eq!(status, 500);
    assert!(response.contains("error: no compiled component"));
}
