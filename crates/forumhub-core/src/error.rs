//! Shared error type across forumhub crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed message.
    BadRequest,
    /// Frame exceeds the configured size.
    PayloadTooLarge,
    /// Forum id outside the tracked range.
    UnknownForum,
    /// Topic id is not a positive 32-bit integer.
    InvalidTopic,
    /// Unsupported protocol version.
    UnsupportedVersion,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON frames.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ClientCode::UnknownForum => "UNKNOWN_FORUM",
            ClientCode::InvalidTopic => "INVALID_TOPIC",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, ForumHubError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum ForumHubError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("payload too large")]
    PayloadTooLarge,
    #[error("unknown forum: {0}")]
    UnknownForum(i64),
    #[error("invalid topic: {0}")]
    InvalidTopic(i64),
    #[error("unsupported protocol version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl ForumHubError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            ForumHubError::BadRequest(_) => ClientCode::BadRequest,
            ForumHubError::PayloadTooLarge => ClientCode::PayloadTooLarge,
            ForumHubError::UnknownForum(_) => ClientCode::UnknownForum,
            ForumHubError::InvalidTopic(_) => ClientCode::InvalidTopic,
            ForumHubError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            ForumHubError::Internal(_) => ClientCode::Internal,
        }
    }
}
