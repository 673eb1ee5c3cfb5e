//! teleop-client: drives a responder from stdin.
//!
//! Each line is one pad input:
//!
//! ```text
//! press up | release up | cancel | stop | neck left | neck reset
//! mute | unmute | toggle | state | quit
//! ```
//!
//! Outcomes and channel events are reported through `tracing`.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use teleop_channel::config::ChannelConfig;
use teleop_channel::domain::{ChannelEvent, Direction, MuteState, NeckMove};
use teleop_channel::error::ChannelError;
use teleop_channel::service::{CommandChannel, ControlPad, PendingCommand};
use teleop_channel::session::{Session, WsSession};

/// One parsed input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Press(Direction),
    Release(Direction),
    Cancel,
    Stop,
    Neck(NeckMove),
    Mute(MuteState),
    ToggleMute,
    State,
    Quit,
}

impl FromStr for Input {
    type Err = ChannelError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().unwrap_or_default().to_ascii_lowercase();
        let arg = words.next().unwrap_or_default();
        match verb.as_str() {
            "press" => arg.parse().map(Self::Press),
            "release" => arg.parse().map(Self::Release),
            "cancel" => Ok(Self::Cancel),
            "stop" => Ok(Self::Stop),
            "neck" => arg.parse().map(Self::Neck),
            "mute" => Ok(Self::Mute(MuteState::Muted)),
            "unmute" => Ok(Self::Mute(MuteState::Unmuted)),
            "toggle" => Ok(Self::ToggleMute),
            "state" => Ok(Self::State),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(ChannelError::InvalidCommand(format!(
                "unknown input {other:?}"
            ))),
        }
    }
}

/// Logs the outcome of a submitted command once it resolves.
fn report(label: &'static str, submitted: Result<Option<PendingCommand>, ChannelError>) {
    match submitted {
        Ok(Some(pending)) => {
            tokio::spawn(async move {
                let correlation_id = pending.correlation_id();
                match pending.await {
                    Ok(data) => tracing::info!(
                        label,
                        correlation_id = ?correlation_id,
                        data = %String::from_utf8_lossy(&data),
                        "command ok"
                    ),
                    Err(e) => tracing::warn!(
                        label,
                        correlation_id = ?correlation_id,
                        code = e.error_code(),
                        retryable = e.is_retryable(),
                        error = %e,
                        "command failed"
                    ),
                }
            });
        }
        Ok(None) => tracing::debug!(label, "input debounced"),
        Err(e) => tracing::warn!(label, code = e.error_code(), error = %e, "command not sent"),
    }
}

async fn log_channel_events(mut events: broadcast::Receiver<ChannelEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => tracing::debug!(
                event_type = event.event_type_str(),
                event = %serde_json::to_string(&event).unwrap_or_default(),
                "channel event"
            ),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(lagged = n, "event log lagged behind channel");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ChannelConfig::from_env();
    tracing::info!(
        url = %config.session_url,
        target_identity = %config.target_identity,
        mode = ?config.delivery_mode(),
        "starting teleop-client"
    );

    let session = Arc::new(WsSession::new(config.event_bus_capacity));
    session
        .connect(&config.session_url, &config.session_token)
        .await
        .with_context(|| format!("connecting to {}", config.session_url))?;

    let session: Arc<dyn Session> = session;
    let channel = Arc::new(CommandChannel::new(
        Arc::clone(&session),
        config.event_bus_capacity,
    ));
    tokio::spawn(log_channel_events(channel.events()));
    let pad = ControlPad::new(
        Arc::clone(&channel),
        config.target_identity.clone(),
        config.delivery_mode(),
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let input = match line.parse::<Input>() {
            Ok(input) => input,
            Err(e) => {
                tracing::warn!(line = %line, error = %e, "ignoring input");
                continue;
            }
        };
        match input {
            Input::Press(d) => report("press", pad.on_press_edge(d).await),
            Input::Release(d) => report("release", pad.on_release_edge(d).await),
            Input::Cancel => report("cancel", pad.on_cancel().await),
            Input::Stop => report("stop", pad.stop().await.map(Some)),
            Input::Neck(n) => report("neck", pad.neck(n).await.map(Some)),
            Input::Mute(state) => match pad.set_mute(state).await {
                Ok(state) => tracing::info!(state = ?state, "mute set"),
                Err(e) => tracing::warn!(error = %e, "mute failed"),
            },
            Input::ToggleMute => match pad.toggle_mute().await {
                Ok(state) => tracing::info!(state = ?state, "mute toggled"),
                Err(e) => tracing::warn!(error = %e, "mute failed"),
            },
            Input::State => tracing::info!(
                session = %channel.session_state().await,
                in_flight = channel.in_flight().await.len(),
                held = ?pad.held().await,
                muted = pad.is_muted().await,
                "client state"
            ),
            Input::Quit => break,
        }
    }

    session.disconnect().await;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn mute_words_request_explicit_states() {
        assert_eq!("mute".parse::<Input>(), Ok(Input::Mute(MuteState::Muted)));
        assert_eq!("unmute".parse::<Input>(), Ok(Input::Mute(MuteState::Unmuted)));
        assert_eq!("toggle".parse::<Input>(), Ok(Input::ToggleMute));
    }

    #[test]
    fn pad_inputs_parse_case_insensitively() {
        assert_eq!("PRESS up".parse::<Input>(), Ok(Input::Press(Direction::Up)));
        assert_eq!("exit".parse::<Input>(), Ok(Input::Quit));
        assert!("wave".parse::<Input>().is_err());
    }
}
