//! Relay configuration: mailbox sizing, frame limits and connection deadlines

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Relay configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Outbound messages a connection may have queued before it is evicted
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,

    /// Largest inbound frame accepted from a client, in bytes
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,

    /// Deadline for a single write to a client, in seconds
    #[serde(default = "default_write_wait")]
    pub write_wait_secs: u64,

    /// Time allowed without any read activity before a peer is considered dead, in seconds
    #[serde(default = "default_pong_wait")]
    pub pong_wait_secs: u64,
}

impl RelayConfig {
    pub fn write_wait(&self) -> Duration {
        Duration::from_secs(self.write_wait_secs)
    }

    pub fn pong_wait(&self) -> Duration {
        Duration::from_secs(self.pong_wait_secs)
    }

    /// Keepalive period: nine tenths of the liveness timeout, so a probe
    /// always goes out before the peer's deadline expires.
    pub fn ping_period(&self) -> Duration {
        self.pong_wait() * 9 / 10
    }

    /// Validate relay configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.mailbox_capacity == 0 {
            return Err(ValidationError::InvalidMailboxCapacity);
        }
        if self.max_message_size == 0 {
            return Err(ValidationError::InvalidMessageSize);
        }
        if self.write_wait_secs == 0 || self.write_wait_secs > 300 {
            return Err(ValidationError::InvalidWriteWait);
        }
        if self.pong_wait_secs < 2 || self.pong_wait_secs > 3600 {
            return Err(ValidationError::InvalidPongWait);
        }
        Ok(())
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: default_mailbox_capacity(),
            max_message_size: default_max_message_size(),
            write_wait_secs: default_write_wait(),
            pong_wait_secs: default_pong_wait(),
        }
    }
}

fn default_mailbox_capacity() -> usize {
    256
}

fn default_max_message_size() -> usize {
    512
}

fn default_write_wait() -> u64 {
    10
}

fn default_pong_wait() -> u64 {
    60
}
