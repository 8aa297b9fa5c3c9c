//! Transport layer (WebSocket).
//!
//! Exposes the upgrade handler and the codec that turns frames into client
//! events before they reach the presence hub.

pub mod codec;
pub mod ws;
