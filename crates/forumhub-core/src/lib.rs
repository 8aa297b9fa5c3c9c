//! forumhub core: transport-agnostic ids, protocol frames, and the error type.
//!
//! This crate defines the wire-level contracts of the presence hub and the
//! error surface shared by the gateway and its tests. It carries no transport
//! or runtime dependencies.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Malformed client input surfaces as `ForumHubError`, never as a crash.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod ids;
pub mod protocol;

/// Shared result type.
pub use error::{ClientCode, ForumHubError, Result};
pub use ids::{ConnectionId, ForumId, TopicId};
