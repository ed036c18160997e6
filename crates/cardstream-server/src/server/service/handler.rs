//! The `/stream-data` endpoint.
//!
//! Each request opens its own [`StreamSession`] writing into a bounded channel
//! whose receiver is the response body. Records flow as soon as the session
//! produces them; the handler itself returns immediately with the headers.

use crate::server::{
    config::ServerConfig,
    streaming::{coordinator::supervise, tracker::ActiveStreams},
};
use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use cardstream_core::{Catalog, ChannelSink, EVENT_STREAM_HEADERS, SessionConfig, StreamSession};
use core::convert::Infallible;
use std::sync::Arc;
use tokio_stream::{StreamExt, wrappers::ReceiverStream};
use tokio_util::sync::CancellationToken;

/// State shared by every request.
#[derive(Debug, Clone)]
pub struct AppState {
    catalog: Arc<Catalog>,
    session: SessionConfig,
    stream_buffer_size: usize,
    shutdown: CancellationToken,
    active: Arc<ActiveStreams>,
}

impl AppState {
    /// Streams opened from this state are cancelled when `shutdown` is.
    pub fn new(
        catalog: Arc<Catalog>,
        session: SessionConfig,
        stream_buffer_size: usize,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            catalog,
            session,
            stream_buffer_size,
            shutdown,
            active: ActiveStreams::new(),
        }
    }

    pub fn from_config(
        catalog: Arc<Catalog>,
        config: &ServerConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self::new(catalog, config.session, config.stream_buffer_size, shutdown)
    }

    pub fn active_streams(&self) -> Arc<ActiveStreams> {
        Arc::clone(&self.active)
    }
}

pub async fn stream_data(State(state): State<AppState>) -> Response {
    if state.shutdown.is_cancelled() {
        return (StatusCode::SERVICE_UNAVAILABLE, "shutting down").into_response();
    }

    let (sink, frames) = ChannelSink::channel(state.stream_buffer_size);
    let watch = sink.clone();
    let guard = state.active.enter();
    let session = StreamSession::open_with_token(
        Arc::clone(&state.catalog),
        state.session,
        sink,
        &state.shutdown,
    );
    tracing::info!(active = state.active.count(), "Stream opened");
    tokio::spawn(supervise(session, watch, guard));

    let body = Body::from_stream(ReceiverStream::new(frames).map(Ok::<Bytes, Infallible>));
    let mut response = Response::new(body);
    let headers = response.headers_mut();
    for (name, value) in EVENT_STREAM_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    response
}
