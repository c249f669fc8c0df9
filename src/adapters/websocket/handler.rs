//! WebSocket upgrade handler for relay connections.
//!
//! Handles the HTTP → WebSocket upgrade and hands the socket to the relay:
//! 1. Negotiate the upgrade with the inbound frame size capped
//! 2. Admit the connection (register, announce, spawn both pumps)
//! 3. Return without waiting for the pumps
//!
//! A failed negotiation is dropped; it never reaches the hub.

use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::Response,
    routing::get,
    Router,
};

use super::connection::{admit, PumpSettings};
use super::hub::HubHandle;

/// State required for WebSocket handling.
#[derive(Debug, Clone)]
pub struct WebSocketState {
    /// Handle to the running hub.
    pub hub: HubHandle,
    /// Limits and deadlines applied to every connection.
    pub settings: PumpSettings,
}

impl WebSocketState {
    /// Create a new WebSocket state.
    pub fn new(hub: HubHandle, settings: PumpSettings) -> Self {
        Self { hub, settings }
    }
}

/// Handle WebSocket upgrade requests.
///
/// Route: `GET /ws`
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<WebSocketState>) -> Response {
    let limit = state.settings.max_message_size;

    ws.max_message_size(limit)
        .max_frame_size(limit)
        .on_failed_upgrade(|error| {
            tracing::debug!(%error, "WebSocket upgrade failed");
        })
        .on_upgrade(move |socket| async move {
            admit(socket, state.hub, state.settings).await;
        })
}

/// Create axum router for the WebSocket endpoint.
///
/// # Example
///
/// ```ignore
/// let app = Router::new()
///     .merge(websocket_router())
///     .with_state(ws_state);
/// ```
pub fn websocket_router() -> Router<WebSocketState> {
    Router::new().route("/ws", get(ws_handler))
}
