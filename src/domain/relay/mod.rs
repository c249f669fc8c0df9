//! Relay domain - identities and the lines exchanged between clients.

mod ids;
mod message;

pub use ids::ConnectionId;
pub use message::{Announcement, BroadcastMessage, LINE_TERMINATOR, SYSTEM_PREFIX};
