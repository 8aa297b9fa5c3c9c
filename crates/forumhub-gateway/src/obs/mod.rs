//! Lightweight in-process metrics.
//!
//! Prometheus-compatible text exposition rendered by the `/metrics` handler.
//! Metrics are atomics keyed by sorted label sets; no exporter crate.

pub mod metrics;

pub use metrics::{GatewayMetrics, PresenceSnapshot};
