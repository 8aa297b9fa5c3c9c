use std::net::IpAddr;
use std::sync::Arc;

use forumhub_core::error::Result;
use forumhub_core::protocol::{ClientEvent, ServerEvent};
use forumhub_core::{ConnectionId, ForumId, TopicId};

use crate::presence::registry::{PresenceRegistry, PresenceState};
use crate::realtime::{PreparedMsg, RealtimeCore};

/// Per-connection presence hub.
///
/// Bound to one `(connection, ip)` pair for the life of a socket. Every event
/// runs as a single critical section on the registry: membership check,
/// mutation, recount and enqueue all happen under the same lock, so two
/// concurrent entries from one IP cannot both be seen as "new".
///
/// Notifications are fire-and-forget. Counts are always recomputed from the
/// current sets, so a dropped frame is corrected by the next change.
pub struct PresenceHub {
    registry: Arc<PresenceRegistry>,
    egress: Arc<RealtimeCore>,
    conn: ConnectionId,
    ip: IpAddr,
}

impl PresenceHub {
    /// Bind a hub to a connection, sizing the forum map to `forum_count`.
    pub fn new(
        registry: Arc<PresenceRegistry>,
        egress: Arc<RealtimeCore>,
        conn: ConnectionId,
        ip: IpAddr,
        forum_count: u32,
    ) -> Self {
        if registry.ensure_forums_initialized(forum_count) {
            tracing::info!(forum_count, "presence forum map resized");
        }
        Self { registry, egress, conn, ip }
    }

    pub fn connection_id(&self) -> &ConnectionId {
        &self.conn
    }

    pub fn ip(&self) -> IpAddr {
        self.ip
    }

    pub fn handle(&self, ev: ClientEvent) -> Result<()> {
        match ev {
            ClientEvent::EnterForum { forum } => self.enter_forum(forum),
            ClientEvent::LeaveForum { forum } => self.leave_forum(forum),
            ClientEvent::EnterTopic { forum, topic } => self.enter_topic(forum, topic),
            ClientEvent::LeaveTopic { forum, topic } => self.leave_topic(forum, topic),
        }
    }

    /// Reply with the forum snapshot; broadcast it to the forum only when
    /// this IP was not already counted there.
    pub fn enter_forum(&self, forum: ForumId) -> Result<()> {
        let mut reg = self.registry.lock();
        reg.forum(forum)?;

        if let Some(prev) = reg.find_forum_containing(&self.conn).filter(|p| *p != forum) {
            tracing::warn!(conn = %self.conn, from = %prev, to = %forum, "entered forum without leaving previous one");
            self.exit_forum(&mut reg, prev);
        }

        let is_new_ip = !reg.forum(forum)?.contains_ip(self.ip);
        reg.add_to_forum(forum, &self.conn, self.ip)?;

        let forum_count = reg.forum_distinct(forum)?;
        tracing::debug!(conn = %self.conn, %forum, is_new_ip, forum_count, "enter forum");

        let snapshot = ServerEvent::TotalConnectedUsers {
            forum_count,
            topics: Some(reg.topic_counts()),
        };
        let Some(msg) = prepare(&snapshot) else { return Ok(()) };

        self.egress.send_to(&self.conn, &msg);
        if is_new_ip {
            self.egress.broadcast(reg.forum(forum)?.connections(), Some(&self.conn), &msg);
        }
        Ok(())
    }

    pub fn leave_forum(&self, forum: ForumId) -> Result<()> {
        let mut reg = self.registry.lock();
        reg.forum(forum)?;
        self.exit_forum(&mut reg, forum);
        Ok(())
    }

    /// Per-connection idempotent. A viewer from an IP already counted on the
    /// topic is recorded without a broadcast, so the count survives either
    /// tab leaving.
    pub fn enter_topic(&self, forum: ForumId, topic: TopicId) -> Result<()> {
        let mut reg = self.registry.lock();
        reg.forum(forum)?;

        match reg.find_topic_containing(&self.conn) {
            Some(seat) if seat.topic == topic => {
                if seat.forum != forum {
                    tracing::warn!(conn = %self.conn, %topic, from = %seat.forum, to = %forum, "topic re-entered under another forum");
                    reg.add_to_topic(topic, forum, &self.conn, self.ip);
                }
                return Ok(());
            }
            Some(seat) => {
                tracing::warn!(conn = %self.conn, from = %seat.topic, to = %topic, "entered topic without leaving previous one");
                self.exit_topic(&mut reg, seat.forum, seat.topic);
            }
            None => {}
        }

        reg.ensure_topic_tracked(topic);
        let ip_counted = reg.topic(topic).is_some_and(|s| s.contains_ip(self.ip));
        reg.add_to_topic(topic, forum, &self.conn, self.ip);

        if ip_counted {
            tracing::debug!(conn = %self.conn, %topic, "ip already viewing topic");
            return Ok(());
        }
        tracing::debug!(conn = %self.conn, %forum, %topic, count = reg.topic_distinct(topic), "enter topic");
        self.announce_topic_count(&reg, forum, topic);
        Ok(())
    }

    pub fn leave_topic(&self, forum: ForumId, topic: TopicId) -> Result<()> {
        let mut reg = self.registry.lock();
        reg.forum(forum)?;
        self.exit_topic(&mut reg, forum, topic);
        Ok(())
    }

    /// Transport-initiated cleanup. Forum side and topic side run
    /// independently; the topic count goes to the forum recorded when the
    /// topic was entered.
    pub fn disconnect(&self) {
        let mut reg = self.registry.lock();

        if let Some(forum) = reg.find_forum_containing(&self.conn) {
            self.exit_forum(&mut reg, forum);
        }
        if let Some(seat) = reg.find_topic_containing(&self.conn) {
            self.exit_topic(&mut reg, seat.forum, seat.topic);
        }
        tracing::debug!(conn = %self.conn, "presence cleared");
    }

    fn exit_forum(&self, reg: &mut PresenceState, forum: ForumId) {
        let Some(ip) = reg.remove_from_forum(forum, &self.conn) else {
            tracing::debug!(conn = %self.conn, %forum, "leave forum without enter");
            return;
        };
        let Ok(set) = reg.forum(forum) else { return };
        if set.contains_ip(ip) {
            return;
        }

        let ev = ServerEvent::TotalConnectedUsers {
            forum_count: reg.forum_distinct(forum).unwrap_or(0),
            topics: None,
        };
        if let Some(msg) = prepare(&ev) {
            self.egress.broadcast(set.connections(), None, &msg);
        }
    }

    fn exit_topic(&self, reg: &mut PresenceState, forum: ForumId, topic: TopicId) {
        let Some(ip) = reg.remove_from_topic(topic, &self.conn) else {
            tracing::debug!(conn = %self.conn, %topic, "leave topic without enter");
            return;
        };
        if reg.topic(topic).is_some_and(|s| s.contains_ip(ip)) {
            return;
        }
        self.announce_topic_count(reg, forum, topic);
    }

    /// Topic counts go to the parent forum's observers, not the topic's own
    /// viewers.
    fn announce_topic_count(&self, reg: &PresenceState, forum: ForumId, topic: TopicId) {
        let Ok(observers) = reg.forum(forum) else {
            tracing::debug!(%forum, %topic, "parent forum no longer tracked");
            return;
        };
        let ev = ServerEvent::UpdateCounterPost {
            topic_id: topic,
            count: reg.topic_distinct(topic),
        };
        if let Some(msg) = prepare(&ev) {
            self.egress.broadcast(observers.connections(), None, &msg);
        }
    }
}

fn prepare(ev: &ServerEvent) -> Option<PreparedMsg> {
    match PreparedMsg::prepare(ev) {
        Ok(m) => Some(m),
        Err(e) => {
            tracing::warn!(error = %e, "presence frame encode failed");
            None
        }
    }
}
