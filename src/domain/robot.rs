//! Simulated robot state kept by the responder.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::command::{Action, Direction, MuteState, NeckMove};
use super::CorrelationId;

/// Degrees the neck moves per click.
pub const NECK_STEP_DEG: i16 = 15;
/// Pan limit in either direction, in degrees.
pub const NECK_PAN_LIMIT_DEG: i16 = 90;
/// Tilt limit in either direction, in degrees.
pub const NECK_TILT_LIMIT_DEG: i16 = 45;

/// Neck servo pose in degrees; `(0, 0)` is centered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NeckPose {
    /// Horizontal angle, positive to the right.
    pub pan: i16,
    /// Vertical angle, positive up.
    pub tilt: i16,
}

impl NeckPose {
    /// Applies one neck click, clamping at the servo limits.
    #[must_use]
    pub fn step(self, movement: NeckMove) -> Self {
        let pan = |delta: i16| {
            self.pan
                .saturating_add(delta)
                .clamp(-NECK_PAN_LIMIT_DEG, NECK_PAN_LIMIT_DEG)
        };
        let tilt = |delta: i16| {
            self.tilt
                .saturating_add(delta)
                .clamp(-NECK_TILT_LIMIT_DEG, NECK_TILT_LIMIT_DEG)
        };
        match movement {
            NeckMove::Up => Self {
                tilt: tilt(NECK_STEP_DEG),
                ..self
            },
            NeckMove::Down => Self {
                tilt: tilt(-NECK_STEP_DEG),
                ..self
            },
            NeckMove::Left => Self {
                pan: pan(-NECK_STEP_DEG),
                ..self
            },
            NeckMove::Right => Self {
                pan: pan(NECK_STEP_DEG),
                ..self
            },
            NeckMove::Reset => Self::default(),
        }
    }
}

/// Everything the responder tracks about its robot.
#[derive(Debug, Clone, Serialize)]
pub struct RobotState {
    /// Identity commands must be addressed to.
    pub identity: String,
    /// Direction the base is driving in; `None` when stopped.
    pub motion: Option<Direction>,
    /// Current neck pose.
    pub neck: NeckPose,
    /// Whether the microphone is muted.
    pub muted: bool,
    /// Number of commands applied since start.
    pub commands_applied: u64,
    /// Number of commands refused since start.
    pub commands_rejected: u64,
    /// When the last command was applied.
    pub last_command_at: Option<DateTime<Utc>>,
}

impl RobotState {
    /// Creates a stopped, centered, unmuted robot.
    #[must_use]
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            motion: None,
            neck: NeckPose::default(),
            muted: false,
            commands_applied: 0,
            commands_rejected: 0,
            last_command_at: None,
        }
    }

    /// Applies an action and returns the short status text reported back.
    pub fn apply(&mut self, action: Action) -> String {
        match action {
            Action::Direction(d) => self.motion = Some(d),
            Action::Stop => self.motion = None,
            Action::Neck(n) => self.neck = self.neck.step(n),
            Action::Mute(m) => self.muted = m == MuteState::Muted,
        }
        self.commands_applied = self.commands_applied.saturating_add(1);
        self.last_command_at = Some(Utc::now());
        action.method().to_string()
    }
}

/// Event emitted by the responder.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum RobotEvent {
    /// A command was applied to the robot.
    CommandApplied {
        /// Correlation ID, for acknowledged commands.
        #[serde(skip_serializing_if = "Option::is_none")]
        correlation_id: Option<CorrelationId>,
        /// Action applied.
        action: Action,
        /// Resulting motion.
        motion: Option<Direction>,
        /// Resulting neck pose.
        neck: NeckPose,
        /// Resulting mute flag.
        muted: bool,
        /// Application timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A command was refused.
    CommandRejected {
        /// Correlation ID, for acknowledged commands.
        #[serde(skip_serializing_if = "Option::is_none")]
        correlation_id: Option<CorrelationId>,
        /// Method as received.
        method: String,
        /// Error code sent back.
        code: u32,
        /// Rejection timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl RobotEvent {
    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::CommandApplied { .. } => "command_applied",
            Self::CommandRejected { .. } => "command_rejected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neck_clamps_at_limits() {
        let mut pose = NeckPose::default();
        for _ in 0..10 {
            pose = pose.step(NeckMove::Up);
        }
        assert_eq!(pose.tilt, NECK_TILT_LIMIT_DEG);
        for _ in 0..10 {
            pose = pose.step(NeckMove::Left);
        }
        assert_eq!(pose.pan, -NECK_PAN_LIMIT_DEG);
        assert_eq!(pose.step(NeckMove::Reset), NeckPose::default());
    }

    #[test]
    fn apply_updates_state() {
        let mut state = RobotState::new("robot-1");
        assert_eq!(state.apply(Action::Direction(Direction::Up)), "up");
        assert_eq!(state.motion, Some(Direction::Up));
        state.apply(Action::Stop);
        assert_eq!(state.motion, None);
        state.apply(Action::Neck(NeckMove::Right));
        assert_eq!(state.neck.pan, NECK_STEP_DEG);
        state.apply(Action::Mute(MuteState::Muted));
        assert!(state.muted);
        assert_eq!(state.commands_applied, 4);
        assert!(state.last_command_at.is_some());
    }
}
