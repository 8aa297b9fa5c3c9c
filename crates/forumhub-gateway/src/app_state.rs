//! Shared application state for the forumhub gateway.
//!
//! Owns the process-wide presence registry and egress core. Both are built
//! once here and handed to every hub by `Arc`; nothing lives in statics.

use std::net::IpAddr;
use std::sync::Arc;

use forumhub_core::error::Result;
use forumhub_core::ConnectionId;

use crate::catalog::{ForumCatalog, StaticForumCatalog};
use crate::config::GatewayConfig;
use crate::obs::{GatewayMetrics, PresenceSnapshot};
use crate::presence::{PresenceHub, PresenceRegistry};
use crate::realtime::RealtimeCore;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    catalog: Arc<dyn ForumCatalog>,
    presence: Arc<PresenceRegistry>,
    realtime: Arc<RealtimeCore>,
    metrics: Arc<GatewayMetrics>,
}

impl AppState {
    /// Build state with the config-backed forum catalog.
    pub fn new(cfg: GatewayConfig) -> Self {
        let catalog = Arc::new(StaticForumCatalog::new(cfg.forums.count));
        Self::with_catalog(cfg, catalog)
    }

    pub fn with_catalog(cfg: GatewayConfig, catalog: Arc<dyn ForumCatalog>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                cfg,
                catalog,
                presence: Arc::new(PresenceRegistry::new()),
                realtime: Arc::new(RealtimeCore::new()),
                metrics: Arc::new(GatewayMetrics::default()),
            }),
        }
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn presence(&self) -> Arc<PresenceRegistry> {
        Arc::clone(&self.inner.presence)
    }

    pub fn realtime(&self) -> Arc<RealtimeCore> {
        Arc::clone(&self.inner.realtime)
    }

    pub fn metrics(&self) -> &GatewayMetrics {
        &self.inner.metrics
    }

    /// Instantiate a hub for a freshly registered connection. Re-reads the
    /// forum count each time so the registry follows catalog changes.
    pub async fn presence_hub(&self, conn: ConnectionId, ip: IpAddr) -> Result<PresenceHub> {
        let forum_count = self.inner.catalog.forum_count().await?;
        Ok(PresenceHub::new(
            self.presence(),
            self.realtime(),
            conn,
            ip,
            forum_count,
        ))
    }

    /// Registry and egress totals for a `/metrics` scrape.
    pub fn presence_snapshot(&self) -> PresenceSnapshot {
        let stats = self.inner.presence.stats();
        let rt = &self.inner.realtime;
        PresenceSnapshot {
            forums_tracked: stats.forums,
            topics_active: stats.active_topics,
            connections_located: stats.located_connections,
            sessions_registered: rt.sessions.len(),
            egress_dropped_full: rt.dropped_full(),
            egress_dropped_closed: rt.dropped_closed(),
        }
    }
}
