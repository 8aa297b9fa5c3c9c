//! Presence registry: forum and topic membership, keyed by connection.
//!
//! Pure data. All mutation happens on [`PresenceState`] behind the registry's
//! single lock; the hub holds that lock across check, mutate, count and
//! enqueue so notification decisions are never based on a stale view.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use forumhub_core::error::{ForumHubError, Result};
use forumhub_core::{ConnectionId, ForumId, TopicId};

/// Connections present in one forum or topic: `connection -> ip`.
#[derive(Debug, Default, Clone)]
pub struct PresenceSet {
    members: HashMap<ConnectionId, IpAddr>,
}

impl PresenceSet {
    pub fn contains(&self, conn: &ConnectionId) -> bool {
        self.members.contains_key(conn)
    }

    pub fn contains_ip(&self, ip: IpAddr) -> bool {
        self.members.values().any(|v| *v == ip)
    }

    /// Number of connections (not distinct visitors).
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn connections(&self) -> impl Iterator<Item = &ConnectionId> {
        self.members.keys()
    }

    fn insert(&mut self, conn: ConnectionId, ip: IpAddr) {
        self.members.insert(conn, ip);
    }

    fn remove(&mut self, conn: &ConnectionId) -> Option<IpAddr> {
        self.members.remove(conn)
    }
}

/// Distinct visitors: unique IPs among the set's connections.
pub fn distinct_ip_count(set: &PresenceSet) -> usize {
    set.members.values().collect::<HashSet<_>>().len()
}

/// The topic a connection views, and the forum whose observers hear about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicSeat {
    pub topic: TopicId,
    pub forum: ForumId,
}

/// Where one connection currently is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Location {
    pub forum: Option<ForumId>,
    pub topic: Option<TopicSeat>,
}

impl Location {
    fn is_empty(&self) -> bool {
        self.forum.is_none() && self.topic.is_none()
    }
}

/// Registry totals, for metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub forums: usize,
    pub active_topics: usize,
    pub located_connections: usize,
}

/// The two presence maps plus the `connection -> location` index.
///
/// Invariants:
/// - `forums[i]` exists for every forum id `1..=forums.len()`, possibly empty.
/// - a topic entry exists iff its set is non-empty (outside a hub critical
///   section, see [`PresenceState::ensure_topic_tracked`]).
/// - `locations[c]` mirrors set membership exactly and is dropped once empty.
#[derive(Debug, Default)]
pub struct PresenceState {
    forums: Vec<PresenceSet>,
    topics: HashMap<TopicId, PresenceSet>,
    locations: HashMap<ConnectionId, Location>,
}

impl PresenceState {
    /// Size the forum map to `forum_count`. No-op when the size already
    /// matches; otherwise the map is rebuilt with one empty set per forum and
    /// every connection loses its forum location. Topic seats are untouched.
    /// Returns whether it changed.
    pub fn ensure_forums_initialized(&mut self, forum_count: u32) -> bool {
        let count = forum_count as usize;
        if self.forums.len() == count {
            return false;
        }

        self.forums = std::iter::repeat_with(PresenceSet::default).take(count).collect();
        self.locations.retain(|_, loc| {
            loc.forum = None;
            !loc.is_empty()
        });
        true
    }

    pub fn forum_count(&self) -> usize {
        self.forums.len()
    }

    pub fn forum(&self, forum: ForumId) -> Result<&PresenceSet> {
        forum_index(forum)
            .and_then(|idx| self.forums.get(idx))
            .ok_or(ForumHubError::UnknownForum(i64::from(forum.get())))
    }

    fn forum_mut(&mut self, forum: ForumId) -> Result<&mut PresenceSet> {
        forum_index(forum)
            .and_then(|idx| self.forums.get_mut(idx))
            .ok_or(ForumHubError::UnknownForum(i64::from(forum.get())))
    }

    pub fn forum_distinct(&self, forum: ForumId) -> Result<usize> {
        self.forum(forum).map(distinct_ip_count)
    }

    /// Record `conn` in `forum`. A connection lives in at most one forum, so
    /// any previous forum membership is pruned silently; callers that need to
    /// notify the old forum must exit it first.
    pub fn add_to_forum(&mut self, forum: ForumId, conn: &ConnectionId, ip: IpAddr) -> Result<()> {
        self.forum(forum)?;

        let prev = self.locations.get(conn).and_then(|l| l.forum);
        if let Some(prev) = prev.filter(|p| *p != forum) {
            if let Ok(set) = self.forum_mut(prev) {
                set.remove(conn);
            }
        }

        self.forum_mut(forum)?.insert(conn.clone(), ip);
        self.locations.entry(conn.clone()).or_default().forum = Some(forum);
        Ok(())
    }

    /// Remove `conn` from `forum`. `None` when it was not there.
    pub fn remove_from_forum(&mut self, forum: ForumId, conn: &ConnectionId) -> Option<IpAddr> {
        let ip = self.forum_mut(forum).ok()?.remove(conn)?;
        self.update_location(conn, |loc| {
            if loc.forum == Some(forum) {
                loc.forum = None;
            }
        });
        Some(ip)
    }

    /// Create an empty set for `topic` if absent. Callers must either add a
    /// connection or observe an existing one before releasing the lock.
    pub fn ensure_topic_tracked(&mut self, topic: TopicId) {
        self.topics.entry(topic).or_default();
    }

    pub fn topic(&self, topic: TopicId) -> Option<&PresenceSet> {
        self.topics.get(&topic)
    }

    pub fn topic_distinct(&self, topic: TopicId) -> usize {
        self.topic(topic).map(distinct_ip_count).unwrap_or(0)
    }

    /// Record `conn` as viewing `topic` under `forum`. Any previous topic
    /// seat is pruned silently (deleting that topic if it empties).
    pub fn add_to_topic(&mut self, topic: TopicId, forum: ForumId, conn: &ConnectionId, ip: IpAddr) {
        let prev = self.locations.get(conn).and_then(|l| l.topic);
        if let Some(prev) = prev.filter(|p| p.topic != topic) {
            self.remove_from_topic(prev.topic, conn);
        }

        self.topics.entry(topic).or_default().insert(conn.clone(), ip);
        self.locations.entry(conn.clone()).or_default().topic = Some(TopicSeat { topic, forum });
    }

    /// Remove `conn` from `topic`, deleting the topic entry once empty.
    pub fn remove_from_topic(&mut self, topic: TopicId, conn: &ConnectionId) -> Option<IpAddr> {
        let set = self.topics.get_mut(&topic)?;
        let ip = set.remove(conn);
        if set.is_empty() {
            self.topics.remove(&topic);
        }
        let ip = ip?;
        self.update_location(conn, |loc| {
            if loc.topic.map(|s| s.topic) == Some(topic) {
                loc.topic = None;
            }
        });
        Some(ip)
    }

    /// `{topic -> distinct visitors}` for every topic with at least one viewer.
    pub fn topic_counts(&self) -> BTreeMap<TopicId, usize> {
        self.topics
            .iter()
            .filter(|(_, set)| !set.is_empty())
            .map(|(id, set)| (*id, distinct_ip_count(set)))
            .collect()
    }

    pub fn find_forum_containing(&self, conn: &ConnectionId) -> Option<ForumId> {
        self.locations.get(conn).and_then(|l| l.forum)
    }

    pub fn find_topic_containing(&self, conn: &ConnectionId) -> Option<TopicSeat> {
        self.locations.get(conn).and_then(|l| l.topic)
    }

    pub fn location(&self, conn: &ConnectionId) -> Location {
        self.locations.get(conn).copied().unwrap_or_default()
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            forums: self.forums.len(),
            active_topics: self.topics.len(),
            located_connections: self.locations.len(),
        }
    }

    fn update_location(&mut self, conn: &ConnectionId, f: impl FnOnce(&mut Location)) {
        if let Some(loc) = self.locations.get_mut(conn) {
            f(loc);
            if loc.is_empty() {
                self.locations.remove(conn);
            }
        }
    }
}

fn forum_index(forum: ForumId) -> Option<usize> {
    (forum.get() as usize).checked_sub(1)
}

/// Process-wide presence registry. Constructed once by the application state
/// and shared by `Arc` with every hub; the sole owner of presence data.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    state: Mutex<PresenceState>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the state. A poisoned lock is recovered: no operation leaves the
    /// state half-updated.
    pub fn lock(&self) -> MutexGuard<'_, PresenceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn ensure_forums_initialized(&self, forum_count: u32) -> bool {
        self.lock().ensure_forums_initialized(forum_count)
    }

    pub fn forum_distinct_count(&self, forum: ForumId) -> Option<usize> {
        self.lock().forum_distinct(forum).ok()
    }

    pub fn forum_connection_count(&self, forum: ForumId) -> Option<usize> {
        self.lock().forum(forum).map(PresenceSet::len).ok()
    }

    /// `None` when the topic has no entry at all.
    pub fn topic_distinct_count(&self, topic: TopicId) -> Option<usize> {
        self.lock().topic(topic).map(distinct_ip_count)
    }

    pub fn topic_connection_count(&self, topic: TopicId) -> Option<usize> {
        self.lock().topic(topic).map(PresenceSet::len)
    }

    pub fn is_topic_tracked(&self, topic: TopicId) -> bool {
        self.lock().topic(topic).is_some()
    }

    pub fn location(&self, conn: &ConnectionId) -> Location {
        self.lock().location(conn)
    }

    pub fn stats(&self) -> RegistryStats {
        self.lock().stats()
    }
}
