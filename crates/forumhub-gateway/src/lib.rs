//! forumhub gateway library entry.
//!
//! Wires the WebSocket transport, presence hub and registry, egress, forum
//! catalog and metrics into one service. Consumed by the binary (`main.rs`)
//! and by integration tests.

pub mod app_state;
pub mod catalog;
pub mod config;
pub mod context;
pub mod obs;
pub mod presence;
pub mod realtime;
pub mod router;
pub mod transport;
