//! Connection identity value object.

use std::fmt;
use uuid::Uuid;

/// Identity assigned to a connection at upgrade time.
///
/// Backed by a random UUID and displayed as its first six characters. The
/// short form is what peers see in front of relayed messages; equality and
/// hashing use the full UUID so two connections never share a registry slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Number of characters shown when displayed.
    pub const DISPLAY_LEN: usize = 6;

    /// Creates a new random ConnectionId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a ConnectionId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = Uuid::encode_buffer();
        let hyphenated = self.0.hyphenated().encode_lower(&mut buf);
        f.write_str(&hyphenated[..Self::DISPLAY_LEN])
    }
}
