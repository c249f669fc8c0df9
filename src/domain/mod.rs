//! Domain layer - the vocabulary of the relay.
//!
//! Pure value types with no I/O: connection identities, relayed lines and
//! membership announcements.

pub mod relay;
