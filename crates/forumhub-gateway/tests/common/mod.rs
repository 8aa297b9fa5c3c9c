//! Shared harness: hubs bound to in-memory outbound queues.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

use std::net::IpAddr;
use std::sync::Arc;

use axum::extract::ws::Message;
use serde_json::Value;
use tokio::sync::mpsc;

use forumhub_gateway::presence::{PresenceHub, PresenceRegistry};
use forumhub_gateway::realtime::{Connection, RealtimeCore};

pub struct World {
    pub registry: Arc<PresenceRegistry>,
    pub realtime: Arc<RealtimeCore>,
    pub forums: u32,
}

pub struct Client {
    pub hub: PresenceHub,
    pub rx: mpsc::Receiver<Message>,
}

impl World {
    pub fn new(forums: u32) -> Self {
        Self {
            registry: Arc::new(PresenceRegistry::new()),
            realtime: Arc::new(RealtimeCore::new()),
            forums,
        }
    }

    pub fn connect(&self, ip: &str) -> Client {
        self.connect_with_queue(ip, 256)
    }

    pub fn connect_with_queue(&self, ip: &str, queue: usize) -> Client {
        self.connect_full(ip, queue, self.forums)
    }

    /// Connect while the catalog reports `forums` forums.
    pub fn connect_with_forums(&self, ip: &str, forums: u32) -> Client {
        self.connect_full(ip, 256, forums)
    }

    fn connect_full(&self, ip: &str, queue: usize, forums: u32) -> Client {
        let ip: IpAddr = ip.parse().unwrap();
        let (tx, rx) = mpsc::channel(queue);
        let conn = self.realtime.sessions.register(Connection { tx, ip });
        let hub = PresenceHub::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.realtime),
            conn,
            ip,
            forums,
        );
        Client { hub, rx }
    }

    /// Socket gone: presence cleanup then egress removal, as the transport does.
    pub fn drop_client(&self, c: &Client) {
        c.hub.disconnect();
        self.realtime.sessions.remove(c.hub.connection_id());
    }
}

impl Client {
    /// Everything queued for this client so far, parsed.
    pub fn drain(&mut self) -> Vec<Value> {
        let mut out = Vec::new();
        while let Ok(m) = self.rx.try_recv() {
            if let Message::Text(s) = m {
                out.push(serde_json::from_str(&s).unwrap());
            }
        }
        out
    }
}

pub fn of_type<'a>(frames: &'a [Value], ty: &str) -> Vec<&'a Value> {
    frames.iter().filter(|f| f["type"] == ty).collect()
}
