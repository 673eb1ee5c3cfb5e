//! WebSocket session client.
//!
//! [`WsSession`] connects to a responder's `/ws` endpoint with
//! `tokio-tungstenite` and speaks the [`WsMessage`] envelope. A writer task
//! drains an outbound queue into the socket; a reader task turns response
//! and error envelopes into [`SessionEvent::InboundResponse`] and reports
//! the connection as lost when the socket closes.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use super::{OutboundMessage, Session};
use crate::domain::{EventBus, SessionEvent, SessionState};
use crate::error::SessionError;
use crate::ws::messages::{WsMessage, WsMessageType};

type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Tasks and queue belonging to one open socket.
#[derive(Debug)]
struct Link {
    outbound: mpsc::UnboundedSender<Message>,
    reader: JoinHandle<()>,
}

impl Link {
    fn shutdown(self) {
        // Dropping the queue lets the writer send a close frame and exit.
        drop(self.outbound);
        self.reader.abort();
    }
}

/// Session over a WebSocket connection to a responder.
#[derive(Debug)]
pub struct WsSession {
    state: Arc<watch::Sender<SessionState>>,
    events: EventBus<SessionEvent>,
    link: Mutex<Option<Link>>,
}

impl WsSession {
    /// Creates a disconnected session.
    #[must_use]
    pub fn new(event_bus_capacity: usize) -> Self {
        let (state, _) = watch::channel(SessionState::Disconnected);
        Self {
            state: Arc::new(state),
            events: EventBus::new(event_bus_capacity),
            link: Mutex::new(None),
        }
    }

    /// Appends the access token as a percent-encoded `token` query
    /// parameter.
    fn endpoint(url: &str, token: &str) -> Result<String, SessionError> {
        let mut parsed = Url::parse(url.trim())
            .map_err(|e| SessionError::ConnectFailed(format!("invalid url {url:?}: {e}")))?;
        if !token.is_empty() {
            parsed.query_pairs_mut().append_pair("token", token);
        }
        Ok(parsed.into())
    }
}

#[async_trait]
impl Session for WsSession {
    async fn connect(&self, url: &str, token: &str) -> Result<(), SessionError> {
        let mut link = self.link.lock().await;
        if link.is_some() {
            if self.state().is_connected() {
                return Err(SessionError::AlreadyConnected);
            }
            // The remote side closed the previous socket; clean up its tasks.
            if let Some(stale) = link.take() {
                stale.shutdown();
            }
        }

        let endpoint = Self::endpoint(url, token)?;
        self.state.send_replace(SessionState::Connecting);
        let stream = match tokio_tungstenite::connect_async(endpoint).await {
            Ok((stream, _response)) => stream,
            Err(e) => {
                self.state.send_replace(SessionState::Disconnected);
                tracing::warn!(url, error = %e, "session connect failed");
                return Err(SessionError::ConnectFailed(e.to_string()));
            }
        };

        let (mut sink, source) = stream.split();
        let (outbound, mut queue) = mpsc::unbounded_channel::<Message>();
        tokio::spawn(async move {
            while let Some(msg) = queue.recv().await {
                if sink.send(msg).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });
        let reader = tokio::spawn(read_loop(
            source,
            self.events.clone(),
            Arc::clone(&self.state),
        ));

        *link = Some(Link { outbound, reader });
        self.state.send_replace(SessionState::Connected);
        let _ = self.events.publish(SessionEvent::Connected);
        tracing::info!(url, "session connected");
        Ok(())
    }

    async fn disconnect(&self) {
        let Some(link) = self.link.lock().await.take() else {
            return;
        };
        let was_connected = self.state.send_replace(SessionState::Disconnected).is_connected();
        link.shutdown();
        if was_connected {
            let _ = self.events.publish(SessionEvent::Disconnected);
        }
        tracing::info!("session disconnected");
    }

    async fn send(&self, message: OutboundMessage) -> Result<(), SessionError> {
        let link = self.link.lock().await;
        let Some(link) = link.as_ref() else {
            return Err(SessionError::NotConnected);
        };
        if !self.state().is_connected() {
            return Err(SessionError::NotConnected);
        }
        let text = serde_json::to_string(&WsMessage::command(&message))?;
        link.outbound
            .send(Message::text(text))
            .map_err(|_| SessionError::SendFailed("writer task is gone".to_string()))?;
        tracing::debug!(
            method = %message.method,
            target = %message.target,
            ack = message.ack_requested,
            "command queued"
        );
        Ok(())
    }

    fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn state(&self) -> SessionState {
        *self.state.borrow()
    }
}

/// Reads envelopes until the socket closes, then reports the connection as
/// lost unless it was closed deliberately.
async fn read_loop(
    mut source: WsSource,
    events: EventBus<SessionEvent>,
    state: Arc<watch::Sender<SessionState>>,
) {
    while let Some(frame) = source.next().await {
        match frame {
            Ok(Message::Text(text)) => handle_text(text.as_str(), &events),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "session read failed");
                break;
            }
        }
    }

    let was_connected = state.send_replace(SessionState::Disconnected).is_connected();
    if was_connected {
        tracing::warn!("session closed by remote");
        let _ = events.publish(SessionEvent::Disconnected);
    }
}

fn handle_text(text: &str, events: &EventBus<SessionEvent>) {
    let Ok(msg) = serde_json::from_str::<WsMessage>(text) else {
        tracing::warn!("dropping undecodable frame");
        return;
    };
    match msg.msg_type {
        WsMessageType::Response | WsMessageType::Error => {
            let Some(correlation_id) = msg.correlation_id() else {
                tracing::warn!(id = %msg.id, payload = %msg.payload, "uncorrelated response");
                return;
            };
            let payload = serde_json::to_vec(&msg.payload).unwrap_or_default();
            let _ = events.publish(SessionEvent::InboundResponse {
                correlation_id,
                payload,
            });
        }
        WsMessageType::Event => {
            tracing::debug!(payload = %msg.payload, "responder event");
        }
        WsMessageType::Command => {
            tracing::debug!("ignoring command frame sent to controller");
        }
    }
}
