//! The single page handler every path falls through to.

use crate::server::request::{self, ALLOWED_METHODS};
use crate::server::SharedState;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use rendr_core::{BundleSnapshot, Phase, RenderError};

/// Render a page, or serve a client asset in development.
///
/// Requests wait here while the bundle is compiling. Every failure is
/// answered on this request only.
pub async fn handle_request(
    State(state): State<SharedState>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    if !request::is_allowed(&method) {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, ALLOWED_METHODS)],
            "error: method not allowed",
        )
            .into_response();
    }

    let Some(snapshot) = state.supervisor.wait_ready().await else {
        let message = match state.supervisor.phase() {
            Phase::Failed(message) => message,
            _ => "bundle is not available".to_string(),
        };
        tracing::error!("Cannot render {}: {}", uri.path(), message);
        return plain(StatusCode::INTERNAL_SERVER_ERROR, format!("error: {}", message));
    };

    if state.is_dev() && method == Method::GET {
        if let Some(response) = serve_asset(&state, &snapshot, uri.path()) {
            return response;
        }
    }

    let page = match request::parse_request(
        &method,
        &uri,
        &body,
        state.pipeline.selector_param(),
    ) {
        Ok(page) => page,
        Err(e) => return render_error(uri.path(), &e),
    };

    match state.pipeline.render_page(&page, &snapshot).await {
        Ok(html) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            html,
        )
            .into_response(),
        Err(e) => render_error(&page.pathname, &e),
    }
}

fn serve_asset(state: &SharedState, snapshot: &BundleSnapshot, path: &str) -> Option<Response> {
    let key = request::asset_key(state.pipeline.assets().public_path(), path)?;
    let (content, content_type) = snapshot.assets.get(&key)?;

    Some(
        (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, content_type.clone()),
                (header::CACHE_CONTROL, "no-cache".to_string()),
            ],
            content.clone(),
        )
            .into_response(),
    )
}

/// Log a render failure and answer with `error: <message>`.
fn render_error(pathname: &str, error: &RenderError) -> Response {
    match error.stack() {
        Some(stack) => tracing::error!("Render failed for {}: {}\n{}", pathname, error, stack),
        None => tracing::error!("Render failed for {}: {}", pathname, error),
    }

    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    plain(status, format!("error: {}", error))
}

fn plain(status: StatusCode, body: String) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}
