//! Top-level facade crate for forumhub.
//!
//! Re-exports the core types and the gateway library so users can depend on
//! a single crate.

pub mod core {
    pub use forumhub_core::*;
}

pub mod gateway {
    pub use forumhub_gateway::*;
}
