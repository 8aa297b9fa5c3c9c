//! Realtime egress for the presence hub.
//!
//! Session registry (connection id -> outbound queue) plus fan-out helpers.
//! Membership lives in `presence`; this layer only knows how to reach a
//! connection.

pub mod core;
pub mod types;

pub use core::{Connection, RealtimeCore, SessionRegistry};
pub use types::PreparedMsg;
