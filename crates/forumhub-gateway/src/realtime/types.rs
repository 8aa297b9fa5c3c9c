use axum::extract::ws::Message;

use forumhub_core::error::Result;
use forumhub_core::protocol::ServerEvent;

/// Frame serialized once and cloned per recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedMsg(String);

impl PreparedMsg {
    pub fn prepare(ev: &ServerEvent) -> Result<Self> {
        Ok(Self(ev.to_json()?))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_ws_message(&self) -> Message {
        Message::Text(self.0.clone())
    }
}
