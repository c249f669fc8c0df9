//! HTTP adapters - the routes the relay exposes.
//!
//! - `GET /` - static landing page
//! - `GET /ws` - WebSocket upgrade into the relay

pub mod landing;

pub use landing::{landing_page, HOME_PAGE};

use std::time::Duration;

use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::adapters::websocket::{websocket_router, WebSocketState};
use crate::config::ServerConfig;

/// Build the complete application router.
///
/// The request timeout only wraps the landing page: an upgraded socket
/// outlives its HTTP request and is bounded by the relay deadlines instead.
pub fn app_router(server: &ServerConfig, state: WebSocketState) -> Router {
    let request_timeout = Duration::from_secs(server.request_timeout_secs);

    Router::new()
        .route(
            "/",
            get(landing_page).layer(TimeoutLayer::new(request_timeout)),
        )
        .merge(websocket_router())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
