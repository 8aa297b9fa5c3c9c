use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;

use forumhub_core::ConnectionId;

/// One live socket: its outbound queue and the IP resolved at upgrade.
#[derive(Clone)]
pub struct Connection {
    pub tx: mpsc::Sender<Message>,
    pub ip: IpAddr,
}

/// Session registry: `connection_id -> Connection`.
///
/// Owns connection ids. Ids are minted from a process-wide sequence and never
/// reused.
pub struct SessionRegistry {
    sessions: DashMap<ConnectionId, Connection>,
    seq: AtomicU64,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            seq: AtomicU64::new(1),
        }
    }

    /// Register a socket and hand back its fresh id.
    pub fn register(&self, conn: Connection) -> ConnectionId {
        let n = self.seq.fetch_add(1, Ordering::Relaxed);
        let id = ConnectionId::from(format!("c{n}"));
        self.sessions.insert(id.clone(), conn);
        id
    }

    pub fn remove(&self, id: &ConnectionId) -> Option<Connection> {
        self.sessions.remove(id).map(|(_, conn)| conn)
    }

    pub fn get(&self, id: &ConnectionId) -> Option<Connection> {
        self.sessions.get(id).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
