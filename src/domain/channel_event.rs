//! Notifications the channel publishes for controllers.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{CorrelationId, SessionState};

/// Lifecycle state of a pending request.
///
/// `InFlight` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    /// Sent and waiting for a response.
    InFlight,
    /// Answered successfully.
    Acked,
    /// Deadline passed without a response.
    TimedOut,
    /// Resolved with an error other than a timeout.
    Failed,
}

impl RequestState {
    /// Returns `true` for every state except `InFlight`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::InFlight)
    }
}

/// Event emitted by the command channel.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum ChannelEvent {
    /// An acknowledged request left the `InFlight` state.
    CommandResolved {
        /// Correlation ID of the request.
        correlation_id: CorrelationId,
        /// Wire method of the command.
        method: &'static str,
        /// Target identity.
        target: String,
        /// Terminal state reached.
        state: RequestState,
        /// Error text for non-acked outcomes.
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        /// Milliseconds between issue and resolution.
        latency_ms: i64,
        /// Resolution timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The observed session state changed.
    SessionStateChanged {
        /// Previous state.
        from: SessionState,
        /// New state.
        to: SessionState,
        /// Requests failed by the transition.
        swept: usize,
        /// Transition timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl ChannelEvent {
    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::CommandResolved { .. } => "command_resolved",
            Self::SessionStateChanged { .. } => "session_state_changed",
        }
    }
}
