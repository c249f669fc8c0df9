//! Listening socket acquisition.
//!
//! The relay either binds its configured address or, when started through
//! systemd socket activation, adopts the already-open socket the service
//! manager passed in. Activation is detected the systemd way: `LISTEN_PID`
//! names this process, and the first passed descriptor is 3.

use std::io;

use thiserror::Error;
use tokio::net::TcpListener;

/// Environment variable systemd sets to the PID the sockets are meant for.
pub const LISTEN_PID_VAR: &str = "LISTEN_PID";

/// First descriptor passed by the service manager.
pub const LISTEN_FDS_START: i32 = 3;

/// Errors that can occur while acquiring the listening socket
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to adopt inherited socket: {0}")]
    Inherited(#[source] io::Error),

    #[error("Socket activation is not supported on this platform")]
    Unsupported,
}

/// Where the listening socket comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenSource {
    /// Descriptor handed over by the service manager.
    Inherited,
    /// Fresh bind to a `host:port` address; host names are resolved first.
    Bind(String),
}

impl ListenSource {
    /// Decide from the `LISTEN_PID` hint and our own process id.
    pub fn detect(listen_pid: Option<&str>, pid: u32, addr: String) -> Self {
        match listen_pid.and_then(|value| value.trim().parse::<u32>().ok()) {
            Some(target) if target == pid => ListenSource::Inherited,
            _ => ListenSource::Bind(addr),
        }
    }

    /// Inspect the process environment.
    pub fn from_env(addr: String) -> Self {
        let listen_pid = std::env::var(LISTEN_PID_VAR).ok();
        Self::detect(listen_pid.as_deref(), std::process::id(), addr)
    }
}

/// Acquire the listening socket. Called once at startup.
pub async fn acquire(source: ListenSource) -> Result<TcpListener, ListenerError> {
    match source {
        ListenSource::Inherited => {
            let listener = inherited()?;
            tracing::info!("Listening on inherited socket");
            Ok(listener)
        }
        ListenSource::Bind(addr) => {
            let listener = match TcpListener::bind(addr.as_str()).await {
                Ok(listener) => listener,
                Err(source) => return Err(ListenerError::Bind { addr, source }),
            };
            tracing::info!(
                addr = %addr,
                local = ?listener.local_addr().ok(),
                "Listening"
            );
            Ok(listener)
        }
    }
}

#[cfg(unix)]
fn inherited() -> Result<TcpListener, ListenerError> {
    use std::os::fd::FromRawFd;

    // SAFETY: LISTEN_PID names this process, so the service manager passed
    // descriptor 3 to us as an open listening socket, and nothing else in the
    // process has taken ownership of it.
    let listener = unsafe { std::net::TcpListener::from_raw_fd(LISTEN_FDS_START) };
    listener
        .set_nonblocking(true)
        .map_err(ListenerError::Inherited)?;
    TcpListener::from_std(listener).map_err(ListenerError::Inherited)
}

#[cfg(not(unix))]
fn inherited() -> Result<TcpListener, ListenerError> {
    Err(ListenerError::Unsupported)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> String {
        "127.0.0.1:0".to_string()
    }

    #[test]
    fn matching_listen_pid_selects_inherited_socket() {
        assert_eq!(
            ListenSource::detect(Some("4242"), 4242, addr()),
            ListenSource::Inherited
        );
    }

    #[test]
    fn other_process_pid_falls_back_to_bind() {
        assert_eq!(
            ListenSource::detect(Some("4242"), 7, addr()),
            ListenSource::Bind(addr())
        );
    }

    #[test]
    fn missing_or_garbled_hint_falls_back_to_bind() {
        assert_eq!(ListenSource::detect(None, 7, addr()), ListenSource::Bind(addr()));
        assert_eq!(
            ListenSource::detect(Some("not-a-pid"), 7, addr()),
            ListenSource::Bind(addr())
        );
    }

    #[tokio::test]
    async fn bind_acquires_ephemeral_port() {
        let listener = acquire(ListenSource::Bind(addr())).await.unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let held = acquire(ListenSource::Bind(addr())).await.unwrap();
        let taken = held.local_addr().unwrap();

        let result = acquire(ListenSource::Bind(taken.to_string())).await;

        assert!(matches!(
            result,
            Err(ListenerError::Bind { addr, .. }) if addr == taken.to_string()
        ));
    }

    #[tokio::test]
    async fn bind_resolves_host_names() {
        let listener = acquire(ListenSource::Bind("localhost:0".to_string()))
            .await
            .unwrap();
        assert!(listener.local_addr().unwrap().ip().is_loopback());
    }

    #[tokio::test]
    async fn unresolvable_host_is_a_bind_error() {
        let result = acquire(ListenSource::Bind("no-such-host.invalid:0".to_string())).await;
        assert!(matches!(result, Err(ListenerError::Bind { .. })));
    }
}
