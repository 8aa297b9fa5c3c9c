//! Per-connection context resolved at upgrade time.
//!
//! Transport specifics (headers, socket peer) stop here; the presence layer
//! only ever sees a plain `IpAddr`.

pub mod client_ip;

pub use client_ip::resolve_client_ip;
