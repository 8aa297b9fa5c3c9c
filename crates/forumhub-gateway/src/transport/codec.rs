//! Decode-once codec for the transport layer.
//!
//! - Text frames => `ClientEvent`
//! - Binary frames => rejected (the hub protocol is text-only)
//! - Ping/Pong/Close are surfaced for lifecycle management

use axum::extract::ws::Message;
use forumhub_core::{
    error::{ForumHubError, Result},
    protocol::ClientEvent,
};

#[derive(Debug)]
pub enum Inbound {
    Event(ClientEvent),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close,
}

pub fn decode(msg: Message) -> Result<Inbound> {
    match msg {
        Message::Text(s) => ClientEvent::decode(&s).map(Inbound::Event),
        Message::Binary(_) => Err(ForumHubError::BadRequest("binary frames not supported".into())),
        Message::Ping(v) => Ok(Inbound::Ping(v)),
        Message::Pong(v) => Ok(Inbound::Pong(v)),
        Message::Close(_) => Ok(Inbound::Close),
    }
}

/// Cheap length check, done before any parsing.
pub fn frame_len(msg: &Message) -> usize {
    match msg {
        Message::Text(s) => s.len(),
        Message::Binary(b) => b.len(),
        Message::Ping(v) | Message::Pong(v) => v.len(),
        Message::Close(_) => 0,
    }
}
