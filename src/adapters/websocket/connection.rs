//! Connection endpoint: one upgraded socket split into two pumps.
//!
//! ```text
//!                 ┌──────────── inbound pump ────────────┐
//!   peer ──read──►│ sanitize, prefix identity, Broadcast │──► Hub
//!                 └──────────────────────────────────────┘
//!                 ┌──────────── outbound pump ───────────┐
//!   peer ◄─write──│ mailbox lines, keepalive pings       │◄── mailbox
//!                 └──────────────────────────────────────┘
//! ```
//!
//! The inbound pump is the only reader of the socket and the outbound pump
//! the only writer, so frames never interleave and no lock is needed. Both
//! run unsupervised. The outbound pump holds a [`Closing`] handle; when it
//! stops, the handle drops and the inbound pump stops reading too.

use std::fmt;
use std::time::Duration;

use axum::extract::ws::Message;
use futures::{Sink, SinkExt, Stream, StreamExt};
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::RelayConfig;
use crate::domain::relay::{Announcement, BroadcastMessage, ConnectionId, LINE_TERMINATOR};

use super::hub::{mailbox, HubHandle, Mailbox};

/// Limits and deadlines shared by both pumps of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpSettings {
    pub mailbox_capacity: usize,
    pub max_message_size: usize,
    pub write_wait: Duration,
    pub pong_wait: Duration,
    pub ping_period: Duration,
}

impl From<&RelayConfig> for PumpSettings {
    fn from(config: &RelayConfig) -> Self {
        Self {
            mailbox_capacity: config.mailbox_capacity,
            max_message_size: config.max_message_size,
            write_wait: config.write_wait(),
            pong_wait: config.pong_wait(),
            ping_period: config.ping_period(),
        }
    }
}

/// Held by the outbound pump for as long as it writes.
pub type Closing = oneshot::Sender<()>;

/// Resolves once the matching [`Closing`] handle is dropped.
pub type Closed = oneshot::Receiver<()>;

/// Pair linking the two pumps of one connection.
pub fn closing() -> (Closing, Closed) {
    oneshot::channel()
}

/// Reasons the outbound pump gives up on a write.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("write deadline of {0:?} exceeded")]
    Deadline(Duration),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Admit an upgraded socket into the relay.
///
/// Registers a fresh identity with the hub, announces it, and spawns the two
/// pumps. Returns as soon as they are spawned; nothing waits on them.
pub async fn admit<S, E>(socket: S, hub: HubHandle, settings: PumpSettings) -> ConnectionId
where
    S: Stream<Item = Result<Message, E>> + Sink<Message, Error = E> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    let id = ConnectionId::new();
    let (tx, rx) = mailbox(settings.mailbox_capacity);

    hub.register(id, tx).await;
    hub.broadcast(Announcement::Joined(id)).await;

    let (writer, reader) = socket.split();
    let (closing, closed) = closing();
    tokio::spawn(outbound_pump(id, hub.clone(), rx, writer, closing, settings));
    tokio::spawn(inbound_pump(id, hub, reader, closed, settings));

    tracing::info!(connection_id = %id, "Connection admitted");
    id
}

/// Read frames from the peer and submit them to the hub.
///
/// Stops on a read error, a frame larger than the configured maximum, a close
/// frame, the end of the stream, when no frame at all (data or pong) arrives
/// within the liveness window, or once the outbound pump has stopped.
/// Unregisters exactly once on the way out.
pub async fn inbound_pump<R, E>(
    id: ConnectionId,
    hub: HubHandle,
    mut reader: R,
    mut closed: Closed,
    settings: PumpSettings,
) where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: fmt::Display,
{
    let mut deadline = Instant::now() + settings.pong_wait;

    loop {
        let next = tokio::select! {
            biased;
            _ = &mut closed => {
                tracing::debug!(connection_id = %id, "Outbound side stopped, dropping reader");
                break;
            }
            next = time::timeout_at(deadline, reader.next()) => next,
        };
        let frame = match next {
            Ok(Some(Ok(frame))) => frame,
            Ok(Some(Err(error))) => {
                tracing::debug!(connection_id = %id, %error, "Receive error");
                break;
            }
            Ok(None) => {
                tracing::debug!(connection_id = %id, "WebSocket stream ended");
                break;
            }
            Err(_) => {
                tracing::info!(
                    connection_id = %id,
                    timeout = ?settings.pong_wait,
                    "Liveness deadline exceeded"
                );
                break;
            }
        };
        deadline = Instant::now() + settings.pong_wait;

        let size = match &frame {
            Message::Text(text) => text.len(),
            Message::Binary(bytes) => bytes.len(),
            _ => 0,
        };
        // Limit applies to the bytes on the wire, before any decoding.
        if size > settings.max_message_size {
            tracing::info!(
                connection_id = %id,
                size,
                limit = settings.max_message_size,
                "Frame exceeds maximum size"
            );
            break;
        }

        let payload = match frame {
            Message::Text(text) => text,
            Message::Binary(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            // Pings are answered by the socket layer; pongs only prove liveness.
            Message::Ping(_) | Message::Pong(_) => continue,
            Message::Close(frame) => {
                tracing::debug!(connection_id = %id, reason = ?frame, "Client sent close frame");
                break;
            }
        };

        hub.broadcast(BroadcastMessage::relay(&id, &payload)).await;
    }

    hub.unregister(id).await;
    drop(reader);
}

/// Drain the mailbox to the peer and keep the connection alive with pings.
///
/// Stops when the mailbox is closed by the hub (after sending a close frame)
/// or when any write fails or misses its deadline. Releases `closing` first so
/// the reader stops at once, then announces the departure.
pub async fn outbound_pump<W>(
    id: ConnectionId,
    hub: HubHandle,
    mut mailbox: Mailbox,
    mut writer: W,
    closing: Closing,
    settings: PumpSettings,
) where
    W: Sink<Message> + Unpin,
    W::Error: fmt::Display,
{
    let mut keepalive =
        time::interval_at(Instant::now() + settings.ping_period, settings.ping_period);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            next = mailbox.recv() => match next {
                Some(first) => {
                    let frame = coalesce(first, &mut mailbox);
                    if let Err(error) = write(&mut writer, Message::Text(frame), settings.write_wait).await {
                        tracing::debug!(connection_id = %id, %error, "Send error, closing connection");
                        break;
                    }
                }
                None => {
                    // Peer may already be gone; the close frame is best effort.
                    let _ = write(&mut writer, Message::Close(None), settings.write_wait).await;
                    tracing::debug!(connection_id = %id, "Mailbox closed, sent close frame");
                    break;
                }
            },
            _ = keepalive.tick() => {
                if let Err(error) = write(&mut writer, Message::Ping(Vec::new()), settings.write_wait).await {
                    tracing::debug!(connection_id = %id, %error, "Keepalive failed, closing connection");
                    break;
                }
            }
        }
    }

    drop(closing);
    hub.broadcast(Announcement::Left(id)).await;
    drop(keepalive);
    let _ = time::timeout(settings.write_wait, writer.close()).await;
    tracing::info!(connection_id = %id, "Connection closed");
}

/// Join the first line with everything already queued, one line each.
fn coalesce(first: BroadcastMessage, mailbox: &mut Mailbox) -> String {
    let mut frame = String::from(first.as_str());
    while let Ok(next) = mailbox.try_recv() {
        frame.push(LINE_TERMINATOR);
        frame.push_str(next.as_str());
    }
    frame
}

async fn write<W>(writer: &mut W, message: Message, wait: Duration) -> Result<(), WriteError>
where
    W: Sink<Message> + Unpin,
    W::Error: fmt::Display,
{
    match time::timeout(wait, writer.send(message)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(error)) => Err(WriteError::Transport(error.to_string())),
        Err(_) => Err(WriteError::Deadline(wait)),
    }
}
