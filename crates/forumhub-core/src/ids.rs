//! Typed identifiers for forums, topics, and live connections.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::error::{ForumHubError, Result};

/// Forum id: a positive integer in `1..=forum_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ForumId(u32);

impl ForumId {
    /// Validate a raw wire value. Range against the forum count is checked by
    /// the registry, not here.
    pub fn parse(raw: i64) -> Result<Self> {
        match u32::try_from(raw) {
            Ok(v) if v > 0 => Ok(Self(v)),
            _ => Err(ForumHubError::UnknownForum(raw)),
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for ForumId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

impl fmt::Display for ForumId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Topic id: unbounded positive id space, only tracked while viewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TopicId(u32);

impl TopicId {
    pub fn parse(raw: i64) -> Result<Self> {
        match u32::try_from(raw) {
            Ok(v) if v > 0 => Ok(Self(v)),
            _ => Err(ForumHubError::InvalidTopic(raw)),
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for TopicId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque per-socket token. Cheap to clone (shared string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Arc<str>);

impl ConnectionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for ConnectionId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
