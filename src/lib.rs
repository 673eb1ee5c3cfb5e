//! # teleop-channel
//!
//! Command dispatch for driving a remote robot over a realtime session.
//!
//! A controller issues a small closed set of commands (direction, stop,
//! neck, mute) to a named robot participant. Commands are either
//! fire-and-forget or acknowledged: an acknowledged command carries a
//! correlation ID, and its future resolves exactly once with the robot's
//! answer, a timeout, or the loss of the session.
//!
//! ## Architecture
//!
//! ```text
//! Controller                                  Responder (teleop-responder)
//!     │                                            │
//!     ├── ControlPad (service/)                    ├── /ws, /health, /state (api/, ws/)
//!     ├── CommandChannel (service/)                ├── RobotService (service/)
//!     │     ├── PendingRegistry (domain/)          └── EventBus<RobotEvent> (domain/)
//!     │     └── SessionEventAdapter (service/)
//!     │
//!     └── Session (session/)
//!           ├── LoopbackSession (in memory)
//!           └── WsSession ──── JSON envelope over WebSocket ────┘
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod session;
pub mod ws;
