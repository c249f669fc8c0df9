//! The hub: sole owner of connection membership and router of broadcasts.
//!
//! The registry lives inside one task and is only reachable through
//! [`HubEvent`]s, so every mutation happens one at a time, in the order the
//! events arrive. No lock guards it.
//!
//! ```text
//!   inbound pump ──Broadcast──┐
//!   setup        ──Register───┤        ┌──► mailbox (conn a) ──► outbound pump
//!   inbound pump ──Unregister─┼──► Hub ┼──► mailbox (conn b) ──► outbound pump
//!   outbound pump──Broadcast──┘        └──► mailbox (conn c) ──► outbound pump
//! ```
//!
//! Fan-out never waits on a peer: a full mailbox evicts its connection in
//! the same step.

use std::collections::HashMap;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;

use crate::domain::relay::{Announcement, BroadcastMessage, ConnectionId};

/// Capacity of the hub's own event queue.
pub const HUB_EVENT_CAPACITY: usize = 1024;

/// Sending side of a connection's outbound mailbox. Held by the hub only.
pub type MailboxSender = mpsc::Sender<BroadcastMessage>;

/// Receiving side of a connection's outbound mailbox. Drained by the outbound pump.
pub type Mailbox = mpsc::Receiver<BroadcastMessage>;

/// Create an empty bounded mailbox.
pub fn mailbox(capacity: usize) -> (MailboxSender, Mailbox) {
    mpsc::channel(capacity)
}

/// Payload of a broadcast event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// A line ready to send as is.
    Message(BroadcastMessage),
    /// A membership announcement, rendered by the hub with its current count.
    Announcement(Announcement),
}

impl From<BroadcastMessage> for Outbound {
    fn from(message: BroadcastMessage) -> Self {
        Outbound::Message(message)
    }
}

impl From<Announcement> for Outbound {
    fn from(announcement: Announcement) -> Self {
        Outbound::Announcement(announcement)
    }
}

/// Events applied by the hub's control loop.
#[derive(Debug)]
pub enum HubEvent {
    Register {
        id: ConnectionId,
        mailbox: MailboxSender,
    },
    Unregister(ConnectionId),
    Broadcast(Outbound),
    MemberCount(oneshot::Sender<usize>),
}

/// Cloneable handle for submitting events to a running [`Hub`].
#[derive(Debug, Clone)]
pub struct HubHandle {
    events: mpsc::Sender<HubEvent>,
}

impl HubHandle {
    /// Add a connection's mailbox to the registry.
    pub async fn register(&self, id: ConnectionId, mailbox: MailboxSender) {
        self.send(HubEvent::Register { id, mailbox }).await;
    }

    /// Remove a connection and close its mailbox. No-op if already gone.
    pub async fn unregister(&self, id: ConnectionId) {
        self.send(HubEvent::Unregister(id)).await;
    }

    /// Fan a message or announcement out to every registered connection.
    pub async fn broadcast(&self, outbound: impl Into<Outbound>) {
        self.send(HubEvent::Broadcast(outbound.into())).await;
    }

    /// Number of registered connections, or `None` if the hub has stopped.
    pub async fn member_count(&self) -> Option<usize> {
        let (reply, rx) = oneshot::channel();
        self.send(HubEvent::MemberCount(reply)).await;
        rx.await.ok()
    }

    async fn send(&self, event: HubEvent) {
        if self.events.send(event).await.is_err() {
            tracing::warn!("Hub is not running, event dropped");
        }
    }
}

/// Registry of live connections, driven by [`Hub::run`].
pub struct Hub {
    members: HashMap<ConnectionId, MailboxSender>,
    events: mpsc::Receiver<HubEvent>,
}

impl Hub {
    /// Create a hub and the handle used to reach it.
    pub fn new(event_capacity: usize) -> (Self, HubHandle) {
        let (tx, rx) = mpsc::channel(event_capacity);
        let hub = Self {
            members: HashMap::new(),
            events: rx,
        };
        (hub, HubHandle { events: tx })
    }

    /// Create a hub with the default event capacity and run it on its own task.
    pub fn spawn() -> HubHandle {
        let (hub, handle) = Self::new(HUB_EVENT_CAPACITY);
        tokio::spawn(hub.run());
        handle
    }

    /// Apply events until every handle has been dropped.
    pub async fn run(mut self) {
        tracing::debug!("Hub started");
        while let Some(event) = self.events.recv().await {
            self.apply(event);
        }
        tracing::debug!(members = self.members.len(), "Hub stopped");
    }

    fn apply(&mut self, event: HubEvent) {
        match event {
            HubEvent::Register { id, mailbox } => self.register(id, mailbox),
            HubEvent::Unregister(id) => self.unregister(&id),
            HubEvent::Broadcast(outbound) => self.broadcast(outbound),
            HubEvent::MemberCount(reply) => {
                // Requester may have given up waiting.
                let _ = reply.send(self.members.len());
            }
        }
    }

    fn register(&mut self, id: ConnectionId, mailbox: MailboxSender) {
        self.members.insert(id, mailbox);
        tracing::debug!(
            connection_id = %id,
            members = self.members.len(),
            "Connection registered"
        );
    }

    fn unregister(&mut self, id: &ConnectionId) {
        // Dropping the sender closes the mailbox; the outbound pump drains what
        // is left and then shuts down.
        if self.members.remove(id).is_some() {
            tracing::debug!(
                connection_id = %id,
                members = self.members.len(),
                "Connection unregistered"
            );
        }
    }

    fn broadcast(&mut self, outbound: Outbound) {
        let message = match outbound {
            Outbound::Message(message) => message,
            Outbound::Announcement(announcement) => {
                let members = self.announced_count(&announcement);
                announcement.render(members)
            }
        };

        self.members.retain(|id, mailbox| match mailbox.try_send(message.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    connection_id = %id,
                    "Mailbox full, evicting slow connection"
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(connection_id = %id, "Mailbox closed, removing connection");
                false
            }
        });
    }

    /// Count reported in an announcement. A departing connection is never
    /// counted, even if its unregistration has not been applied yet.
    fn announced_count(&self, announcement: &Announcement) -> usize {
        match announcement {
            Announcement::Joined(_) => self.members.len(),
            Announcement::Left(id) => {
                self.members.len() - usize::from(self.members.contains_key(id))
            }
        }
    }
}
