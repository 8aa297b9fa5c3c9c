//! Server-to-client push frames.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{ForumHubError, Result};
use crate::ids::TopicId;

use super::PROTOCOL_VERSION;

/// Outbound events. Serialized as `{"v":1,"type":..,"data":{..}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerEvent {
    /// Distinct visitors of a forum, optionally with the active topic counts.
    TotalConnectedUsers {
        forum_count: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        topics: Option<BTreeMap<TopicId, usize>>,
    },
    /// Distinct visitors of one topic.
    UpdateCounterPost { topic_id: TopicId, count: usize },
    /// Sent once after the upgrade completes.
    Connected { connection_id: String },
    /// A rejected client event. The session stays open.
    Error { code: &'static str, msg: String },
}

#[derive(Serialize)]
struct Frame<'a> {
    v: u8,
    #[serde(flatten)]
    event: &'a ServerEvent,
}

impl ServerEvent {
    pub fn error(err: &ForumHubError) -> Self {
        ServerEvent::Error {
            code: err.client_code().as_str(),
            msg: err.to_string(),
        }
    }

    /// Serialize to the text frame body.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&Frame { v: PROTOCOL_VERSION, event: self })
            .map_err(|e| ForumHubError::Internal(format!("json encode failed: {e}")))
    }
}
