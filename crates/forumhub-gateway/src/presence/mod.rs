//! Real-time presence: distinct visitors per forum and per active topic.
//!
//! - `registry`: the shared membership maps (sole owner of presence data).
//! - `hub`: per-connection event handlers that mutate the registry and push
//!   count updates.

pub mod hub;
pub mod registry;

pub use hub::PresenceHub;
pub use registry::{distinct_ip_count, Location, PresenceRegistry, PresenceSet, PresenceState, RegistryStats, TopicSeat};
