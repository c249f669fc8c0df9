//! WebSocket adapters for the broadcast relay.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     ws_handler (GET /ws)                            │
//! │   - Negotiates the upgrade                                          │
//! │   - Admits the socket: register, announce, spawn pumps              │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                     │
//!                                     │ one endpoint per client
//!                                     ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │   inbound pump ──events──►  Hub  ──mailboxes──►  outbound pumps     │
//! │   (reads only)           (registry)              (writes only)      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`hub`] - Single-owner registry and fan-out
//! - [`connection`] - Per-connection inbound and outbound pumps
//! - [`handler`] - Axum WebSocket upgrade handler

pub mod connection;
pub mod handler;
pub mod hub;

pub use connection::{
    admit, closing, inbound_pump, outbound_pump, Closed, Closing, PumpSettings, WriteError,
};
pub use handler::{websocket_router, ws_handler, WebSocketState};
pub use hub::{mailbox, Hub, HubEvent, HubHandle, Mailbox, MailboxSender, Outbound};
