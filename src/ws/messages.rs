//! WebSocket message types: envelope, command payload, and responses.
//!
//! Both the controller's [`crate::session::WsSession`] and the responder's
//! connection loop speak this envelope as JSON text frames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::CorrelationId;
use crate::domain::codec::ResponseFrame;
use crate::session::OutboundMessage;

/// Top-level WebSocket message envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsMessage {
    /// Correlation ID for acknowledged commands and their responses;
    /// a fresh ID otherwise.
    pub id: String,
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub msg_type: WsMessageType,
    /// ISO-8601 timestamp.
    pub timestamp: DateTime<Utc>,
    /// Variant-specific payload.
    pub payload: serde_json::Value,
}

/// Discriminator for WebSocket message types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WsMessageType {
    /// Controller → responder command.
    Command,
    /// Responder → controller answer to an acknowledged command.
    Response,
    /// Responder → controller notification.
    Event,
    /// Responder → controller protocol error.
    Error,
}

/// Payload of a [`WsMessageType::Command`] message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandPayload {
    /// Identity of the participant that should act on the command.
    pub target: String,
    /// Method name, e.g. `"neck_up"`.
    pub method: String,
    /// UTF-8 command value; empty for stop.
    #[serde(default)]
    pub body: String,
    /// Whether the controller waits for a response.
    #[serde(default)]
    pub ack: bool,
    /// Legacy numeric command stream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<u8>,
}

impl WsMessage {
    /// Wraps an outbound command.
    #[must_use]
    pub fn command(message: &OutboundMessage) -> Self {
        let id = message
            .correlation_id
            .unwrap_or_default()
            .to_string();
        let payload = CommandPayload {
            target: message.target.clone(),
            method: message.method.clone(),
            body: String::from_utf8_lossy(&message.payload).into_owned(),
            ack: message.ack_requested,
            stream_id: message.stream_id,
        };
        Self {
            id,
            msg_type: WsMessageType::Command,
            timestamp: Utc::now(),
            payload: serde_json::to_value(payload).unwrap_or_default(),
        }
    }

    /// Wraps a response to the command with the given ID.
    #[must_use]
    pub fn response(id: impl Into<String>, frame: &ResponseFrame) -> Self {
        Self {
            id: id.into(),
            msg_type: WsMessageType::Response,
            timestamp: Utc::now(),
            payload: serde_json::to_value(frame).unwrap_or_default(),
        }
    }

    /// Builds a protocol error. The payload has the shape of an error
    /// [`ResponseFrame`], so a controller can resolve the request it refers to.
    #[must_use]
    pub fn error(id: impl Into<String>, code: u32, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            msg_type: WsMessageType::Error,
            timestamp: Utc::now(),
            payload: serde_json::to_value(ResponseFrame::error(code, message)).unwrap_or_default(),
        }
    }

    /// Builds a notification.
    #[must_use]
    pub fn event(payload: serde_json::Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            msg_type: WsMessageType::Event,
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Returns the correlation ID if `id` holds one.
    #[must_use]
    pub fn correlation_id(&self) -> Option<CorrelationId> {
        self.id.parse().ok()
    }

    /// Serializes the envelope to a JSON string.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{Action, Command, Direction};

    #[test]
    fn command_envelope_carries_correlation_id() {
        let Ok(cmd) = Command::from_action(Action::Direction(Direction::Right), "robot-1") else {
            panic!("valid command");
        };
        let id = CorrelationId::new();
        let msg = WsMessage::command(&OutboundMessage::from_command(&cmd, Some(id)));

        assert_eq!(msg.msg_type, WsMessageType::Command);
        assert_eq!(msg.correlation_id(), Some(id));
        let Ok(payload) = serde_json::from_value::<CommandPayload>(msg.payload) else {
            panic!("command payload should parse");
        };
        assert_eq!(payload.method, "right");
        assert_eq!(payload.body, "RIGHT");
        assert!(payload.ack);
        assert_eq!(payload.stream_id, Some(1));
    }

    #[test]
    fn envelope_uses_type_field() {
        let msg = WsMessage::response("abc", &ResponseFrame::ok("done"));
        let json = msg.to_json();
        assert!(json.contains("\"type\":\"response\""));
        assert!(json.contains("\"status\":\"ok\""));
    }

    #[test]
    fn error_payload_is_an_error_frame() {
        let msg = WsMessage::error("", 400, "malformed JSON");
        let Ok(ResponseFrame::Error { code, message }) =
            serde_json::from_value::<ResponseFrame>(msg.payload)
        else {
            panic!("error payload should be a response frame");
        };
        assert_eq!(code, 400);
        assert_eq!(message, "malformed JSON");
    }

    #[test]
    fn minimal_command_payload_parses() {
        let json = serde_json::json!({"target": "robot-1", "method": "stop"});
        let Ok(payload) = serde_json::from_value::<CommandPayload>(json) else {
            panic!("defaults should fill missing fields");
        };
        assert!(payload.body.is_empty());
        assert!(!payload.ack);
        assert_eq!(payload.stream_id, None);
    }
}
