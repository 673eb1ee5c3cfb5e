//! Session capability: the realtime connection commands travel over.
//!
//! The channel treats a session as an opaque collaborator: it can connect,
//! disconnect, address a message to a named participant, and publish
//! lifecycle and response events. Two implementations ship with the crate:
//!
//! - [`LoopbackSession`]: in-memory, with a scripted responder.
//! - [`WsSession`]: WebSocket client speaking the [`crate::ws::messages`]
//!   envelope.

pub mod loopback;
pub mod ws_client;

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::domain::codec;
use crate::domain::{Command, CorrelationId, SessionEvent, SessionState};
use crate::error::SessionError;

pub use loopback::{LoopbackSession, ReplyMode};
pub use ws_client::WsSession;

/// A message addressed to one remote participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    /// Identity of the participant that should receive the message.
    pub target: String,
    /// Method name, e.g. `"up"`.
    pub method: String,
    /// Opaque payload bytes (UTF-8 for commands).
    pub payload: Vec<u8>,
    /// Whether the sender waits for a response.
    pub ack_requested: bool,
    /// Correlation ID the response must echo; set iff `ack_requested`.
    pub correlation_id: Option<CorrelationId>,
    /// Legacy numeric command stream, if any.
    pub stream_id: Option<u8>,
}

impl OutboundMessage {
    /// Encodes `command`; passing a correlation ID requests an acknowledgement.
    #[must_use]
    pub fn from_command(command: &Command, correlation_id: Option<CorrelationId>) -> Self {
        let encoded = codec::encode(command);
        Self {
            target: command.target().to_string(),
            method: encoded.method.to_string(),
            payload: encoded.payload,
            ack_requested: correlation_id.is_some(),
            correlation_id,
            stream_id: encoded.stream_id,
        }
    }
}

/// A live connection to a signaling server.
///
/// Implementations publish [`SessionEvent::Connected`] once usable,
/// [`SessionEvent::Disconnected`] when the connection is gone for good, and
/// one [`SessionEvent::InboundResponse`] per response received.
#[async_trait]
pub trait Session: Send + Sync + fmt::Debug {
    /// Opens the connection.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyConnected`] if the session is live, or
    /// [`SessionError::ConnectFailed`] if the server cannot be reached.
    async fn connect(&self, url: &str, token: &str) -> Result<(), SessionError>;

    /// Closes the connection. Idempotent.
    async fn disconnect(&self);

    /// Hands a message to the transport.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotConnected`] unless the session is
    /// connected, or another [`SessionError`] if the transport refuses the
    /// message.
    async fn send(&self, message: OutboundMessage) -> Result<(), SessionError>;

    /// Subscribes to future session events.
    fn events(&self) -> broadcast::Receiver<SessionEvent>;

    /// Returns the current connection state.
    fn state(&self) -> SessionState;
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{Action, NeckMove};

    #[test]
    fn fire_and_forget_message_has_no_correlation() {
        let Ok(cmd) = Command::from_action(Action::Stop, "robot-1") else {
            panic!("valid command");
        };
        let msg = OutboundMessage::from_command(&cmd, None);
        assert_eq!(msg.method, "stop");
        assert!(msg.payload.is_empty());
        assert!(!msg.ack_requested);
        assert_eq!(msg.stream_id, Some(2));
    }

    #[test]
    fn acknowledged_message_carries_correlation() {
        let Ok(cmd) = Command::from_action(Action::Neck(NeckMove::Left), "robot-1") else {
            panic!("valid command");
        };
        let id = CorrelationId::new();
        let msg = OutboundMessage::from_command(&cmd, Some(id));
        assert!(msg.ack_requested);
        assert_eq!(msg.correlation_id, Some(id));
        assert_eq!(msg.target, "robot-1");
        assert_eq!(msg.payload, b"NECK_LEFT".to_vec());
    }
}
