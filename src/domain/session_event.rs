//! Session lifecycle and inbound message events.
//!
//! A [`crate::session::Session`] publishes [`SessionEvent`]s through an
//! [`super::EventBus`]. The channel's event adapter consumes them to track
//! [`SessionState`] and resolve pending requests.

use std::fmt;

use serde::Serialize;

use super::CorrelationId;

/// Connection state of a session, as observed by the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No connection.
    #[default]
    Disconnected,
    /// Connection is being established.
    Connecting,
    /// Connection is live; commands may be sent.
    Connected,
    /// Connection dropped and the session is trying to resume it.
    Reconnecting,
}

impl SessionState {
    /// Returns `true` only for [`SessionState::Connected`].
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        };
        f.write_str(s)
    }
}

/// Event emitted by a session.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The session is connected.
    Connected,
    /// The session is gone; in-flight requests cannot be answered.
    Disconnected,
    /// The session lost its connection and is trying to resume.
    Reconnecting,
    /// A response to an acknowledged request.
    InboundResponse {
        /// Correlation ID of the request being answered.
        correlation_id: CorrelationId,
        /// Raw response payload.
        payload: Vec<u8>,
    },
}

impl SessionEvent {
    /// Returns the session state implied by a lifecycle event.
    #[must_use]
    pub const fn state(&self) -> Option<SessionState> {
        match self {
            Self::Connected => Some(SessionState::Connected),
            Self::Disconnected => Some(SessionState::Disconnected),
            Self::Reconnecting => Some(SessionState::Reconnecting),
            Self::InboundResponse { .. } => None,
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Reconnecting => "reconnecting",
            Self::InboundResponse { .. } => "inbound_response",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_events_map_to_states() {
        assert_eq!(
            SessionEvent::Connected.state(),
            Some(SessionState::Connected)
        );
        assert_eq!(
            SessionEvent::Reconnecting.state(),
            Some(SessionState::Reconnecting)
        );
        let response = SessionEvent::InboundResponse {
            correlation_id: CorrelationId::new(),
            payload: Vec::new(),
        };
        assert_eq!(response.state(), None);
        assert_eq!(response.event_type_str(), "inbound_response");
    }

    #[test]
    fn only_connected_allows_commands() {
        assert!(SessionState::Connected.is_connected());
        assert!(!SessionState::Reconnecting.is_connected());
        assert!(!SessionState::default().is_connected());
    }
}
