//! Controller ↔ responder round trips over a real WebSocket.

#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use teleop_channel::api;
use teleop_channel::app_state::AppState;
use teleop_channel::domain::{CommandKind, Direction, EventBus, MuteState, SessionState};
use teleop_channel::error::{ChannelError, SessionError};
use teleop_channel::service::{CommandChannel, ControlPad, DeliveryMode, RobotService};
use teleop_channel::session::{Session, WsSession};

const TIMEOUT: Duration = Duration::from_secs(2);

async fn start_responder(token: Option<&str>) -> (SocketAddr, Arc<RobotService>) {
    let robot = Arc::new(RobotService::new("robot-1", EventBus::new(64)));
    let state = AppState {
        robot: Arc::clone(&robot),
        token: token.map(Arc::from),
    };
    let app = api::build_router().with_state(state);

    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind failed");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("no local addr");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, robot)
}

async fn connect(addr: SocketAddr, token: &str) -> Arc<WsSession> {
    let session = Arc::new(WsSession::new(64));
    let Ok(()) = session.connect(&format!("ws://{addr}/ws"), token).await else {
        panic!("connect failed");
    };
    session
}

fn channel_over(session: &Arc<WsSession>) -> Arc<CommandChannel> {
    let session: Arc<dyn Session> = Arc::clone(session) as Arc<dyn Session>;
    Arc::new(CommandChannel::new(session, 64))
}

#[tokio::test]
async fn acknowledged_command_round_trip() {
    let (addr, robot) = start_responder(None).await;
    let session = connect(addr, "").await;
    let channel = channel_over(&session);

    let result = channel
        .issue(
            CommandKind::Direction,
            "UP",
            "robot-1",
            DeliveryMode::Acknowledged(TIMEOUT),
        )
        .await;
    assert_eq!(result, Ok(b"up".to_vec()));

    let state = robot.snapshot().await;
    assert_eq!(state.motion, Some(Direction::Up));
    assert_eq!(state.commands_applied, 1);
}

#[tokio::test]
async fn wrong_target_is_rejected_with_404() {
    let (addr, _robot) = start_responder(None).await;
    let session = connect(addr, "").await;
    let channel = channel_over(&session);

    let result = channel
        .issue(
            CommandKind::Stop,
            "",
            "robot-9",
            DeliveryMode::Acknowledged(TIMEOUT),
        )
        .await;
    let Err(ChannelError::Rejected { code, .. }) = result else {
        panic!("expected rejection, got {result:?}");
    };
    assert_eq!(code, 404);
}

#[tokio::test]
async fn pad_drives_robot_and_mute_is_acknowledged() {
    let (addr, robot) = start_responder(None).await;
    let session = connect(addr, "").await;
    let pad = ControlPad::new(
        channel_over(&session),
        "robot-1",
        DeliveryMode::Acknowledged(TIMEOUT),
    );

    let Ok(Some(press)) = pad.on_press_edge(Direction::Left).await else {
        panic!("press should issue");
    };
    assert!(press.await.is_ok());
    let Ok(Some(release)) = pad.on_release_edge(Direction::Left).await else {
        panic!("release should issue");
    };
    assert!(release.await.is_ok());
    assert_eq!(pad.toggle_mute().await, Ok(MuteState::Muted));

    let state = robot.snapshot().await;
    assert_eq!(state.motion, None);
    assert!(state.muted);
    assert_eq!(state.commands_applied, 3);
}

#[tokio::test]
async fn token_is_enforced_on_upgrade() {
    let (addr, _robot) = start_responder(Some("secret")).await;
    let url = format!("ws://{addr}/ws");

    let session = WsSession::new(16);
    let refused = session.connect(&url, "wrong").await;
    assert!(matches!(refused, Err(SessionError::ConnectFailed(_))));
    assert_eq!(session.state(), SessionState::Disconnected);

    assert!(session.connect(&url, "secret").await.is_ok());
    assert_eq!(session.state(), SessionState::Connected);
}

#[tokio::test]
async fn token_with_reserved_characters_survives_the_query_string() {
    let token = "s&c#r+t =1";
    let (addr, _robot) = start_responder(Some(token)).await;
    let session = connect(addr, token).await;
    assert_eq!(session.state(), SessionState::Connected);
}

#[tokio::test]
async fn client_disconnect_blocks_new_commands() {
    let (addr, _robot) = start_responder(None).await;
    let session = connect(addr, "").await;
    let channel = channel_over(&session);

    session.disconnect().await;
    // The adapter applies the transition asynchronously.
    for _ in 0..100 {
        if channel.session_state().await == SessionState::Disconnected {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let result = channel
        .issue(
            CommandKind::Mute,
            "",
            "robot-1",
            DeliveryMode::FireAndForget,
        )
        .await;
    assert_eq!(result, Err(ChannelError::SessionUnavailable));
}

#[tokio::test]
async fn health_over_http() {
    let (addr, _robot) = start_responder(None).await;
    let Ok(response) = reqwest::get(format!("http://{addr}/health")).await else {
        panic!("request failed");
    };
    assert!(response.status().is_success());
    let Ok(body) = response.json::<serde_json::Value>().await else {
        panic!("body should be JSON");
    };
    assert_eq!(
        body.get("identity").and_then(|v| v.as_str()),
        Some("robot-1")
    );
}
