//! Adapters - everything that touches the network.

pub mod http;
pub mod listener;
pub mod websocket;
