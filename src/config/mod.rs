//! Relay configuration.
//!
//! Settings come from the process environment (plus a `.env` file during
//! development) through the `config` and `dotenvy` crates. Keys carry the
//! `SILENCE` prefix and sections are separated by double underscores.
//! Command-line flags are applied on top by the binary.
//!
//! # Example
//!
//! ```no_run
//! use silence::config::AppConfig;
//!
//! let config = AppConfig::load().expect("configuration should load");
//! config.validate().expect("configuration should be valid");
//!
//! println!("Relay listening on {}", config.server.listen_addr());
//! ```

mod error;
mod relay;
mod server;

pub use error::{ConfigError, ValidationError};
pub use relay::RelayConfig;
pub use server::ServerConfig;

use serde::Deserialize;

/// Top-level settings.
///
/// Every section has defaults, so an empty environment yields a working relay
/// on `0.0.0.0:8080`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, logging)
    #[serde(default)]
    pub server: ServerConfig,

    /// Relay configuration (mailbox, frame size, deadlines)
    #[serde(default)]
    pub relay: RelayConfig,
}

impl AppConfig {
    /// Read settings from the environment.
    ///
    /// A `.env` file in the working directory is applied first if one exists.
    /// Keys map onto sections like so:
    ///
    /// - `SILENCE__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `SILENCE__RELAY__MAILBOX_CAPACITY=64` -> `relay.mailbox_capacity = 64`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a value cannot be parsed into its field type.
    pub fn load() -> Result<Self, ConfigError> {
        // Missing .env is the normal case outside development.
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("SILENCE")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Check every section, stopping at the first problem.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.relay.validate()?;
        Ok(())
    }
}
