//! Silence - Real-time WebSocket Broadcast Relay
//!
//! Every line a client sends is relayed, prefixed with the sender's short
//! identity, to every connected client. A single hub task owns membership;
//! each connection runs one reading pump and one writing pump.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod server;
