//! HTTP listener.
//!
//! One fallback handler renders every path. In development the reload
//! endpoints are mounted next to it, client assets are served from the
//! current snapshot and CORS is open so pages hosted elsewhere can load them.

mod handler;
mod logging;
mod reload;
pub mod request;
mod state;

pub use state::{AppState, DevEvent, ReloadHub, SharedState};

use crate::error::{CliError, Result};
use axum::{extract::DefaultBodyLimit, middleware, routing::get, Router};
use rendr_core::compose::{RELOAD_EVENTS_ROUTE, RELOAD_SCRIPT_ROUTE};
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// Largest accepted request body (16MB).
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Build the router for `state`.
pub fn router(state: SharedState) -> Router {
    let dev = state.is_dev();

    let mut router = Router::new();
    if dev {
        router = router
            .route(RELOAD_SCRIPT_ROUTE, get(reload::handle_reload_script))
            .route(RELOAD_EVENTS_ROUTE, get(reload::handle_sse));
    }

    let router = router
        .fallback(handler::handle_request)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn(logging::log_request));

    let router = if dev {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    };

    router.with_state(state)
}

/// A bound listener, not yet serving.
///
/// Binding comes first so the real port is known before the pipeline is
/// built (dev asset URLs embed it).
pub struct RenderServer {
    listener: TcpListener,
}

impl RenderServer {
    /// Bind `address`.
    ///
    /// # Errors
    ///
    /// Returns error if the address is invalid or already in use
    pub async fn bind(address: &str) -> Result<Self> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(|e| CliError::Server(format!("Failed to bind to {}: {}", address, e)))?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| CliError::Server(format!("Failed to read bound address: {}", e)))
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn serve<F>(self, state: SharedState, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(self.listener, router(state))
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| CliError::Server(format!("Server error: {}", e)))
    }
}
