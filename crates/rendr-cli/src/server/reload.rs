//! Development reload endpoints.

use crate::server::{DevEvent, SharedState};
use axum::{
    extract::State,
    http::header,
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Sse,
    },
};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::{wrappers::ReceiverStream, Stream, StreamExt};

const RELOAD_SCRIPT: &str = include_str!("../../assets/reload-client.js");

/// Stream reload events to one browser tab.
pub async fn handle_sse(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (id, rx) = state.reload.register();
    tracing::debug!("Reload client {} connected", id);

    state.reload.broadcast(&DevEvent::ClientConnected { id }).await;

    let stream = ReceiverStream::new(rx).map(|data| Ok(Event::default().data(data)));

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

/// Serve the reload client script.
pub async fn handle_reload_script() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/javascript"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        RELOAD_SCRIPT,
    )
}
