//! HTTP surface of the server.
//!
//! - [`handler`] - the `/stream-data` endpoint and its shared state.
//! - [`router`] - wires the endpoint together with CORS.

pub mod handler;

use crate::server::config::AllowedOrigins;
use axum::{Router, http::Method, routing::get};
use handler::{AppState, stream_data};
use tower_http::cors::{AllowOrigin, CorsLayer};

pub const STREAM_PATH: &str = "/stream-data";

/// Browser access policy for the stream endpoint.
///
/// Credentials are allowed in both modes, so a wildcard is expressed by
/// mirroring the request origin rather than answering `*`.
pub fn cors_layer(origins: &AllowedOrigins) -> CorsLayer {
    let allow_origin = match origins {
        AllowedOrigins::Mirror => AllowOrigin::mirror_request(),
        AllowedOrigins::List(list) => AllowOrigin::list(list.iter().cloned()),
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_credentials(true)
}

pub fn router(state: AppState, origins: &AllowedOrigins) -> Router {
    Router::new()
        .route(STREAM_PATH, get(stream_data))
        .layer(cors_layer(origins))
        .with_state(state)
}
