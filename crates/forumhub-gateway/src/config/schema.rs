use std::net::SocketAddr;

use serde::Deserialize;
use forumhub_core::error::{ForumHubError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    pub forums: ForumsSection,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(ForumHubError::UnsupportedVersion);
        }

        self.gateway.validate()?;
        self.forums.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,

    /// Per-connection outbound queue depth. Sends to a full queue are dropped.
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,

    /// Honour `CF-Connecting-IP` / `X-Forwarded-For` when resolving client IPs.
    #[serde(default = "default_trust_forwarded_headers")]
    pub trust_forwarded_headers: bool,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            ping_interval_ms: default_ping_interval_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            max_frame_bytes: default_max_frame_bytes(),
            outbound_queue: default_outbound_queue(),
            trust_forwarded_headers: default_trust_forwarded_headers(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;
        if !(5000..=120000).contains(&self.ping_interval_ms) {
            return Err(ForumHubError::BadRequest(
                "gateway.ping_interval_ms must be between 5000 and 120000".into(),
            ));
        }
        if !(10000..=600000).contains(&self.idle_timeout_ms) {
            return Err(ForumHubError::BadRequest(
                "gateway.idle_timeout_ms must be between 10000 and 600000".into(),
            ));
        }
        if self.idle_timeout_ms <= self.ping_interval_ms {
            return Err(ForumHubError::BadRequest(
                "gateway.idle_timeout_ms must be greater than ping_interval_ms".into(),
            ));
        }
        if !(64..=65536).contains(&self.max_frame_bytes) {
            return Err(ForumHubError::BadRequest(
                "gateway.max_frame_bytes must be between 64 and 65536".into(),
            ));
        }
        if !(16..=65536).contains(&self.outbound_queue) {
            return Err(ForumHubError::BadRequest(
                "gateway.outbound_queue must be between 16 and 65536".into(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            ForumHubError::BadRequest(format!("gateway.listen must be a valid SocketAddr: {e}"))
        })
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_ping_interval_ms() -> u64 {
    20000
}
fn default_idle_timeout_ms() -> u64 {
    60000
}
fn default_max_frame_bytes() -> usize {
    4096
}
fn default_outbound_queue() -> usize {
    1024
}
fn default_trust_forwarded_headers() -> bool {
    true
}

/// Static forum directory: ids `1..=count` exist.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForumsSection {
    pub count: u32,
}

impl ForumsSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=100_000).contains(&self.count) {
            return Err(ForumHubError::BadRequest(
                "forums.count must be between 1 and 100000".into(),
            ));
        }
        Ok(())
    }
}
