//! Command encoding and response decoding.
//!
//! Outbound commands become a method name plus an opaque UTF-8 payload.
//! Acknowledged responses travel back as a JSON [`ResponseFrame`].

use serde::{Deserialize, Serialize};

use super::command::{Action, Command};
use crate::error::ChannelError;

/// On-wire form of a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedCommand {
    /// Method name, e.g. `"up"` or `"neck_reset"`.
    pub method: &'static str,
    /// UTF-8 value bytes; empty for stop.
    pub payload: Vec<u8>,
    /// Legacy numeric command stream, when the action has one.
    pub stream_id: Option<u8>,
}

/// Encodes a command. Never fails for a constructed [`Command`].
#[must_use]
pub fn encode(command: &Command) -> EncodedCommand {
    let action = command.action();
    let payload = match action {
        Action::Stop => Vec::new(),
        other => other.value().as_bytes().to_vec(),
    };
    EncodedCommand {
        method: action.method(),
        payload,
        stream_id: action.stream_id(),
    }
}

/// Response sent by the responder for an acknowledged command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResponseFrame {
    /// The command was applied.
    Ok {
        /// Optional return data.
        #[serde(default)]
        data: String,
    },
    /// The command was refused.
    Error {
        /// Responder-defined error code.
        code: u32,
        /// Human-readable reason.
        message: String,
    },
}

impl ResponseFrame {
    /// Builds a success frame.
    #[must_use]
    pub fn ok(data: impl Into<String>) -> Self {
        Self::Ok { data: data.into() }
    }

    /// Builds an error frame.
    #[must_use]
    pub fn error(code: u32, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }

    /// Serializes the frame to JSON bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// Decodes an acknowledged response into its return data.
///
/// # Errors
///
/// Returns [`ChannelError::MalformedResponse`] if the bytes are empty, not
/// UTF-8, or not a [`ResponseFrame`], and [`ChannelError::Rejected`] if the
/// responder sent an error frame.
pub fn decode(bytes: &[u8]) -> Result<Vec<u8>, ChannelError> {
    if bytes.is_empty() {
        return Err(ChannelError::MalformedResponse("empty payload".to_string()));
    }
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ChannelError::MalformedResponse(format!("invalid utf-8: {e}")))?;
    let frame: ResponseFrame = serde_json::from_str(text)
        .map_err(|e| ChannelError::MalformedResponse(format!("invalid frame: {e}")))?;
    match frame {
        ResponseFrame::Ok { data } => Ok(data.into_bytes()),
        ResponseFrame::Error { code, message } => Err(ChannelError::Rejected { code, message }),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::command::{CommandKind, NeckMove};

    fn command(kind: CommandKind, value: &str) -> Command {
        let Ok(cmd) = Command::new(kind, value, "robot-1") else {
            panic!("valid command");
        };
        cmd
    }

    #[test]
    fn direction_encodes_lowercase_method_and_value_payload() {
        let encoded = encode(&command(CommandKind::Direction, "UP"));
        assert_eq!(encoded.method, "up");
        assert_eq!(encoded.payload, b"UP".to_vec());
        assert_eq!(encoded.stream_id, Some(1));
    }

    #[test]
    fn stop_has_empty_payload() {
        let encoded = encode(&command(CommandKind::Stop, "STOP"));
        assert_eq!(encoded.method, "stop");
        assert!(encoded.payload.is_empty());
    }

    #[test]
    fn neck_reset_encoding() {
        let cmd = command(CommandKind::Neck, NeckMove::Reset.value());
        let encoded = encode(&cmd);
        assert_eq!(encoded.method, "neck_reset");
        assert_eq!(encoded.payload, b"NECK_RESET".to_vec());
    }

    #[test]
    fn decode_ok_frame_returns_data() {
        let bytes = ResponseFrame::ok("moving").to_bytes();
        assert_eq!(decode(&bytes), Ok(b"moving".to_vec()));
    }

    #[test]
    fn decode_ok_frame_without_data() {
        assert_eq!(decode(br#"{"status":"ok"}"#), Ok(Vec::new()));
    }

    #[test]
    fn decode_error_frame_is_rejection() {
        let bytes = ResponseFrame::error(404, "no such participant").to_bytes();
        let Err(ChannelError::Rejected { code, message }) = decode(&bytes) else {
            panic!("expected rejection");
        };
        assert_eq!(code, 404);
        assert_eq!(message, "no such participant");
    }

    #[test]
    fn decode_rejects_empty_and_non_utf8() {
        assert!(matches!(decode(b""), Err(ChannelError::MalformedResponse(_))));
        assert!(matches!(
            decode(&[0xff, 0xfe, 0x00]),
            Err(ChannelError::MalformedResponse(_))
        ));
        assert!(matches!(
            decode(b"ACK"),
            Err(ChannelError::MalformedResponse(_))
        ));
    }
}
