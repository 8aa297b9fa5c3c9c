use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc::error::TrySendError;

use forumhub_core::ConnectionId;

use crate::realtime::core::SessionRegistry;
use crate::realtime::types::PreparedMsg;

/// RealtimeCore: egress engine (send to one connection / fan out to many).
///
/// Every send is `try_send`: it never blocks, so callers may hold the
/// presence lock while enqueueing. A full or closed queue drops the frame;
/// the counts self-heal on the next presence change.
pub struct RealtimeCore {
    pub sessions: SessionRegistry,
    dropped_full: AtomicU64,
    dropped_closed: AtomicU64,
}

impl Default for RealtimeCore {
    fn default() -> Self {
        Self::new()
    }
}

impl RealtimeCore {
    pub fn new() -> Self {
        Self {
            sessions: SessionRegistry::new(),
            dropped_full: AtomicU64::new(0),
            dropped_closed: AtomicU64::new(0),
        }
    }

    /// Enqueue for one connection. Returns whether the frame was queued.
    pub fn send_to(&self, conn: &ConnectionId, msg: &PreparedMsg) -> bool {
        let Some(c) = self.sessions.get(conn) else {
            self.dropped_closed.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(%conn, "send to unknown connection dropped");
            return false;
        };
        match c.tx.try_send(msg.to_ws_message()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped_full.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(%conn, "outbound queue full, frame dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.dropped_closed.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(%conn, "outbound queue closed, frame dropped");
                false
            }
        }
    }

    /// Fan out to `recipients`, skipping `except`. Returns frames queued.
    pub fn broadcast<'a, I>(&self, recipients: I, except: Option<&ConnectionId>, msg: &PreparedMsg) -> usize
    where
        I: IntoIterator<Item = &'a ConnectionId>,
    {
        recipients
            .into_iter()
            .filter(|c| Some(*c) != except)
            .filter(|c| self.send_to(c, msg))
            .count()
    }

    /// Frames dropped because a recipient's queue was full.
    pub fn dropped_full(&self) -> u64 {
        self.dropped_full.load(Ordering::Relaxed)
    }

    /// Frames dropped because the recipient was already gone.
    pub fn dropped_closed(&self) -> u64 {
        self.dropped_closed.load(Ordering::Relaxed)
    }
}
