//! Broadcast payloads and system announcements.
//!
//! Every line a client receives is either a relayed user message
//! (`"<identity> <text>"`) or a system announcement (`"> <text>"`).
//! Lines are joined with `\n` on the wire, so a payload never carries one.

use std::fmt;
use std::sync::Arc;

use super::ConnectionId;

/// Delimiter between lines of a coalesced outbound frame.
pub const LINE_TERMINATOR: char = '\n';

/// Prefix marking a system-originated line.
pub const SYSTEM_PREFIX: &str = ">";

/// Immutable line fanned out to every registered mailbox.
///
/// Cloning is cheap: the text is shared between all recipients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastMessage(Arc<str>);

impl BroadcastMessage {
    /// Builds the relayed form of a client frame.
    ///
    /// The sender prefix is prepended first, then embedded line terminators
    /// become spaces and surrounding whitespace is trimmed.
    pub fn relay(sender: &ConnectionId, payload: &str) -> Self {
        Self::sanitized(&format!("{} {}", sender, payload))
    }

    /// Builds a system-originated line (`"> <text>"`).
    pub fn system(text: &str) -> Self {
        Self::sanitized(&format!("{} {}", SYSTEM_PREFIX, text))
    }

    fn sanitized(raw: &str) -> Self {
        let line = raw.replace(LINE_TERMINATOR, " ");
        Self(Arc::from(line.trim()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BroadcastMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Membership change announced to every connected client.
///
/// Rendered only once the member count is known, so the count reflects the
/// registry at the moment the announcement is fanned out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Announcement {
    Joined(ConnectionId),
    Left(ConnectionId),
}

impl Announcement {
    /// Renders the announcement with the given membership total.
    pub fn render(&self, members: usize) -> BroadcastMessage {
        let text = match self {
            Announcement::Joined(id) => format!("New user connected: {} (total: {})", id, members),
            Announcement::Left(id) => format!("User disconnected: {} (total: {})", id, members),
        };
        BroadcastMessage::system(&text)
    }
}
