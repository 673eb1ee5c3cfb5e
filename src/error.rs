//! Channel error types with stable numeric codes.
//!
//! [`ChannelError`] is the central error type returned to callers of the
//! command channel. Every variant maps to a numeric code so controllers can
//! pick user feedback without matching on message text.
//!
//! [`SessionError`] is the error type of the [`crate::session::Session`]
//! capability; the channel maps it onto [`ChannelError`] at the boundary.

/// Errors surfaced by the command channel.
///
/// # Error Code Ranges
///
/// | Range     | Category          |
/// |-----------|-------------------|
/// | 1000–1999 | Validation        |
/// | 2000–2999 | Session / Delivery|
/// | 3000–3999 | Response          |
/// | 9000–9999 | Internal          |
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// The command could not be built from the given kind, value and target.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// The session was not connected when the command was issued.
    #[error("session unavailable")]
    SessionUnavailable,

    /// No response arrived before the request deadline.
    #[error("timed out waiting for response")]
    Timeout,

    /// The session disconnected while the request was in flight.
    #[error("session lost while request was in flight")]
    SessionLost,

    /// The transport refused the message for a reason other than being
    /// disconnected.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response payload could not be decoded.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The responder answered with an error frame.
    #[error("rejected by responder ({code}): {message}")]
    Rejected {
        /// Responder-defined error code.
        code: u32,
        /// Responder-provided reason.
        message: String,
    },

    /// A correlation ID collided with one that is still in flight.
    #[error("duplicate correlation id: {0}")]
    DuplicateCorrelationId(uuid::Uuid),
}

impl ChannelError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidCommand(_) => 1001,
            Self::SessionUnavailable => 2001,
            Self::Timeout => 2002,
            Self::SessionLost => 2003,
            Self::Transport(_) => 2004,
            Self::MalformedResponse(_) => 3001,
            Self::Rejected { .. } => 3002,
            Self::DuplicateCorrelationId(_) => 9001,
        }
    }

    /// Returns `true` if re-issuing the same command may succeed.
    ///
    /// The channel never retries on its own; this only informs the caller.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SessionUnavailable | Self::Timeout | Self::SessionLost | Self::Transport(_)
        )
    }
}

impl From<SessionError> for ChannelError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotConnected => Self::SessionUnavailable,
            other => Self::Transport(other.to_string()),
        }
    }
}

/// Errors raised by a [`crate::session::Session`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The session has no live connection.
    #[error("session is not connected")]
    NotConnected,

    /// `connect` was called while a connection is already open.
    #[error("session is already connected")]
    AlreadyConnected,

    /// Establishing the connection failed.
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// An outbound message could not be serialized.
    #[error("encode failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// The connection's writer is gone.
    #[error("send failed: {0}")]
    SendFailed(String),
}
