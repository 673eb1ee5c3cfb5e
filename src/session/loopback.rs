//! In-memory session with a scripted responder.
//!
//! [`LoopbackSession`] never touches the network. Every message handed to
//! [`Session::send`] is recorded, and acknowledged requests are answered
//! according to the current [`ReplyMode`]. Tests also drive lifecycle
//! transitions and inject responses by hand.

use async_trait::async_trait;
use tokio::sync::{Mutex, broadcast, watch};

use super::{OutboundMessage, Session};
use crate::domain::codec::ResponseFrame;
use crate::domain::{CorrelationId, EventBus, SessionEvent, SessionState};
use crate::error::SessionError;

/// How the loopback responder answers acknowledged requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyMode {
    /// Reply with an `ok` frame whose data is the method name.
    AutoAck,
    /// Reply with an error frame.
    Reject {
        /// Error code to send.
        code: u32,
        /// Error message to send.
        message: String,
    },
    /// Reply with bytes that are not a response frame.
    Malformed,
    /// Never reply.
    Silent,
}

/// Session that loops commands back to a simulated responder.
#[derive(Debug)]
pub struct LoopbackSession {
    responder_identity: String,
    state: watch::Sender<SessionState>,
    events: EventBus<SessionEvent>,
    sent: Mutex<Vec<OutboundMessage>>,
    reply_mode: Mutex<ReplyMode>,
}

impl LoopbackSession {
    /// Creates a disconnected session whose responder answers as
    /// `responder_identity`.
    #[must_use]
    pub fn new(responder_identity: impl Into<String>, event_bus_capacity: usize) -> Self {
        let (state, _) = watch::channel(SessionState::Disconnected);
        Self {
            responder_identity: responder_identity.into(),
            state,
            events: EventBus::new(event_bus_capacity),
            sent: Mutex::new(Vec::new()),
            reply_mode: Mutex::new(ReplyMode::AutoAck),
        }
    }

    /// Changes how future acknowledged requests are answered.
    pub async fn set_reply_mode(&self, mode: ReplyMode) {
        *self.reply_mode.lock().await = mode;
    }

    /// Returns every message sent so far, oldest first.
    pub async fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().await.clone()
    }

    /// Returns the methods of every message sent so far.
    pub async fn sent_methods(&self) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .map(|m| m.method.clone())
            .collect()
    }

    /// Publishes a raw response for `correlation_id`.
    pub fn respond(&self, correlation_id: CorrelationId, payload: Vec<u8>) {
        let _ = self.events.publish(SessionEvent::InboundResponse {
            correlation_id,
            payload,
        });
    }

    /// Simulates a transient drop: state becomes `Reconnecting`.
    pub fn simulate_reconnecting(&self) {
        self.transition(SessionState::Reconnecting, SessionEvent::Reconnecting);
    }

    /// Simulates a successful resume after [`Self::simulate_reconnecting`].
    pub fn simulate_resumed(&self) {
        self.transition(SessionState::Connected, SessionEvent::Connected);
    }

    /// Simulates the server dropping the connection.
    pub fn simulate_connection_lost(&self) {
        self.transition(SessionState::Disconnected, SessionEvent::Disconnected);
    }

    fn transition(&self, state: SessionState, event: SessionEvent) {
        self.state.send_replace(state);
        let _ = self.events.publish(event);
    }

    fn reply_for(&self, message: &OutboundMessage, mode: &ReplyMode) -> Option<Vec<u8>> {
        if message.target != self.responder_identity {
            return Some(
                ResponseFrame::error(404, format!("participant {} not found", message.target))
                    .to_bytes(),
            );
        }
        match mode {
            ReplyMode::AutoAck => Some(ResponseFrame::ok(message.method.clone()).to_bytes()),
            ReplyMode::Reject { code, message } => {
                Some(ResponseFrame::error(*code, message.clone()).to_bytes())
            }
            ReplyMode::Malformed => Some(b"not a frame".to_vec()),
            ReplyMode::Silent => None,
        }
    }
}

#[async_trait]
impl Session for LoopbackSession {
    async fn connect(&self, url: &str, _token: &str) -> Result<(), SessionError> {
        if self.state().is_connected() {
            return Err(SessionError::AlreadyConnected);
        }
        self.state.send_replace(SessionState::Connecting);
        tracing::debug!(url, "loopback session connected");
        self.transition(SessionState::Connected, SessionEvent::Connected);
        Ok(())
    }

    async fn disconnect(&self) {
        if self.state() == SessionState::Disconnected {
            return;
        }
        self.transition(SessionState::Disconnected, SessionEvent::Disconnected);
    }

    async fn send(&self, message: OutboundMessage) -> Result<(), SessionError> {
        if !self.state().is_connected() {
            return Err(SessionError::NotConnected);
        }

        let reply = match message.correlation_id {
            Some(id) if message.ack_requested => {
                let mode = self.reply_mode.lock().await;
                self.reply_for(&message, &mode).map(|bytes| (id, bytes))
            }
            _ => None,
        };
        self.sent.lock().await.push(message);

        if let Some((id, bytes)) = reply {
            self.respond(id, bytes);
        }
        Ok(())
    }

    fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn state(&self) -> SessionState {
        *self.state.borrow()
    }
}
