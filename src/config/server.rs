//! Server configuration

use serde::Deserialize;
use std::net::Ipv6Addr;

use super::error::ValidationError;

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to: an IP literal or a name resolved at bind time
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Rust log filter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text
    #[serde(default)]
    pub json_logs: bool,

    /// Timeout for plain HTTP requests (landing page), in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    /// `host:port` form handed to the resolver, IPv6 literals bracketed.
    pub fn listen_addr(&self) -> String {
        if self.host.parse::<Ipv6Addr>().is_ok() {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Override host and port from a `host:port` string.
    ///
    /// An empty host (`":9000"`) keeps the configured one.
    pub fn apply_addr(&mut self, addr: &str) -> Result<(), ValidationError> {
        let (host, port) = addr
            .rsplit_once(':')
            .ok_or_else(|| ValidationError::InvalidAddress(addr.to_string()))?;
        let port: u16 = port
            .parse()
            .map_err(|_| ValidationError::InvalidAddress(addr.to_string()))?;
        if !host.is_empty() {
            self.host = host.trim_start_matches('[').trim_end_matches(']').to_string();
        }
        self.port = port;
        Ok(())
    }

    /// Validate server configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        if self.request_timeout_secs == 0 || self.request_timeout_secs > 300 {
            return Err(ValidationError::InvalidTimeout);
        }
        // Names are only resolved when binding; here the host must merely look like one.
        let host = self.host.as_str();
        let plausible = host.parse::<Ipv6Addr>().is_ok()
            || (!host.is_empty()
                && !host.contains(':')
                && !host.chars().any(char::is_whitespace));
        if !plausible {
            return Err(ValidationError::InvalidAddress(self.host.clone()));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            json_logs: false,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info,silence=debug,tower_http=info".to_string()
}

fn default_request_timeout() -> u64 {
    10
}
