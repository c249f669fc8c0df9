//! Relay bootstrap: hub, router and listener wired together.

use thiserror::Error;
use tokio::net::TcpListener;

use crate::adapters::http::app_router;
use crate::adapters::listener::{self, ListenSource, ListenerError};
use crate::adapters::websocket::{Hub, PumpSettings, WebSocketState};
use crate::config::{AppConfig, ValidationError};

/// Errors that end the relay process
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ValidationError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("Server stopped unexpectedly: {0}")]
    Serve(#[source] std::io::Error),
}

/// Start the hub and serve the relay on an already acquired listener.
///
/// Only returns if the accept loop fails.
pub async fn serve(config: &AppConfig, listener: TcpListener) -> Result<(), ServerError> {
    let hub = Hub::spawn();
    let state = WebSocketState::new(hub, PumpSettings::from(&config.relay));
    let app = app_router(&config.server, state);

    axum::serve(listener, app).await.map_err(ServerError::Serve)?;

    Err(ServerError::Serve(std::io::Error::other("accept loop ended")))
}

/// Validate the configuration, acquire the listening socket and serve.
pub async fn run(config: AppConfig) -> Result<(), ServerError> {
    config.validate()?;

    let source = ListenSource::from_env(config.server.listen_addr());
    let listener = listener::acquire(source).await?;

    tracing::info!(
        mailbox_capacity = config.relay.mailbox_capacity,
        max_message_size = config.relay.max_message_size,
        "Relay ready"
    );

    serve(&config, listener).await
}
