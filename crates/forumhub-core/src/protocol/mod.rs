//! Presence hub wire protocol (JSON text frames).
//!
//! - Inbound: a versioned envelope whose `data` stays a `RawValue` until the
//!   message type is known, then becomes a typed `ClientEvent`.
//! - Outbound: `ServerEvent` frames, serialized once and fanned out.
//!
//! Decoding is panic-free: malformed input is reported as `ForumHubError`.

pub mod inbound;
pub mod outbound;

/// Current protocol version for both directions.
pub const PROTOCOL_VERSION: u8 = 1;

pub use inbound::{ClientEvent, Envelope};
pub use outbound::ServerEvent;
