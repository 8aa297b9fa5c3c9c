//! Inbound envelope and the four client-invocable presence events.

use serde::Deserialize;
use serde_json::value::RawValue;

use crate::error::{ForumHubError, Result};
use crate::ids::{ForumId, TopicId};

use super::PROTOCOL_VERSION;

/// Text frame envelope. `data` is parsed lazily once `type` is known.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Envelope {
    /// Protocol version.
    pub v: u8,
    /// Event name (field name is `type` in JSON).
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Optional payload, stored as raw JSON.
    #[serde(default)]
    pub data: Option<Box<RawValue>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ForumArgs {
    forum_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TopicArgs {
    forum_id: i64,
    topic_id: i64,
}

/// A decoded client event with validated ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientEvent {
    EnterForum { forum: ForumId },
    LeaveForum { forum: ForumId },
    EnterTopic { forum: ForumId, topic: TopicId },
    LeaveTopic { forum: ForumId, topic: TopicId },
}

impl ClientEvent {
    /// Parse a full text frame.
    pub fn decode(text: &str) -> Result<Self> {
        let env: Envelope = serde_json::from_str(text)
            .map_err(|e| ForumHubError::BadRequest(format!("invalid envelope json: {e}")))?;
        Self::from_envelope(&env)
    }

    pub fn from_envelope(env: &Envelope) -> Result<Self> {
        if env.v != PROTOCOL_VERSION {
            return Err(ForumHubError::UnsupportedVersion);
        }

        match env.msg_type.as_str() {
            "EnterForum" => {
                let a: ForumArgs = parse_data(env)?;
                Ok(ClientEvent::EnterForum { forum: ForumId::parse(a.forum_id)? })
            }
            "LeaveForum" => {
                let a: ForumArgs = parse_data(env)?;
                Ok(ClientEvent::LeaveForum { forum: ForumId::parse(a.forum_id)? })
            }
            "EnterTopic" => {
                let a: TopicArgs = parse_data(env)?;
                Ok(ClientEvent::EnterTopic {
                    forum: ForumId::parse(a.forum_id)?,
                    topic: TopicId::parse(a.topic_id)?,
                })
            }
            "LeaveTopic" => {
                let a: TopicArgs = parse_data(env)?;
                Ok(ClientEvent::LeaveTopic {
                    forum: ForumId::parse(a.forum_id)?,
                    topic: TopicId::parse(a.topic_id)?,
                })
            }
            other => {
                tracing::debug!(msg_type = %other, "unknown client event");
                Err(ForumHubError::BadRequest(format!("unknown event type: {other}")))
            }
        }
    }

    /// Stable event name, used for logging and metric labels.
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::EnterForum { .. } => "EnterForum",
            ClientEvent::LeaveForum { .. } => "LeaveForum",
            ClientEvent::EnterTopic { .. } => "EnterTopic",
            ClientEvent::LeaveTopic { .. } => "LeaveTopic",
        }
    }
}

fn parse_data<'a, T: Deserialize<'a>>(env: &'a Envelope) -> Result<T> {
    let raw = env
        .data
        .as_ref()
        .ok_or_else(|| ForumHubError::BadRequest(format!("{} requires data", env.msg_type)))?;
    serde_json::from_str(raw.get())
        .map_err(|e| ForumHubError::BadRequest(format!("{} invalid data: {e}", env.msg_type)))
}
