//! Control commands addressed to a remote robot.
//!
//! A [`Command`] pairs a parsed [`Action`] with the identity of the peer that
//! should carry it out. Actions form a closed sum type so encoding never
//! depends on comparing free-form strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ChannelError;

/// Coarse command category, as chosen by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Drive the base in one direction.
    Direction,
    /// Stop all base motion.
    Stop,
    /// Move the neck servo.
    Neck,
    /// Mute or unmute the robot's microphone.
    Mute,
}

/// Base movement direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Forward.
    Up,
    /// Backward.
    Down,
    /// Turn left.
    Left,
    /// Turn right.
    Right,
}

impl Direction {
    /// All four directions, in pad order.
    pub const ALL: [Self; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    /// Canonical upper-case value (`"UP"`, ...).
    #[must_use]
    pub const fn value(self) -> &'static str {
        match self {
            Self::Up => "UP",
            Self::Down => "DOWN",
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

impl FromStr for Direction {
    type Err = ChannelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UP" => Ok(Self::Up),
            "DOWN" => Ok(Self::Down),
            "LEFT" => Ok(Self::Left),
            "RIGHT" => Ok(Self::Right),
            other => Err(ChannelError::InvalidCommand(format!(
                "unknown direction {other:?}"
            ))),
        }
    }
}

/// Neck servo movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeckMove {
    /// Tilt up.
    Up,
    /// Tilt down.
    Down,
    /// Pan left.
    Left,
    /// Pan right.
    Right,
    /// Return to the centered pose.
    Reset,
}

impl NeckMove {
    /// Canonical upper-case value (`"NECK_UP"`, ...).
    #[must_use]
    pub const fn value(self) -> &'static str {
        match self {
            Self::Up => "NECK_UP",
            Self::Down => "NECK_DOWN",
            Self::Left => "NECK_LEFT",
            Self::Right => "NECK_RIGHT",
            Self::Reset => "NECK_RESET",
        }
    }
}

impl FromStr for NeckMove {
    type Err = ChannelError;

    /// Accepts both `"NECK_UP"` and the short form `"up"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let short = upper.strip_prefix("NECK_").unwrap_or(upper.as_str());
        match short {
            "UP" => Ok(Self::Up),
            "DOWN" => Ok(Self::Down),
            "LEFT" => Ok(Self::Left),
            "RIGHT" => Ok(Self::Right),
            "RESET" => Ok(Self::Reset),
            _ => Err(ChannelError::InvalidCommand(format!(
                "unknown neck move {upper:?}"
            ))),
        }
    }
}

/// Microphone state requested by a mute command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MuteState {
    /// Microphone off.
    Muted,
    /// Microphone on.
    Unmuted,
}

/// A fully parsed command action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Action {
    /// Drive the base.
    Direction(Direction),
    /// Stop the base.
    Stop,
    /// Move the neck.
    Neck(NeckMove),
    /// Change microphone state.
    Mute(MuteState),
}

impl Action {
    /// Every action the channel can send.
    pub const ALL: [Self; 12] = [
        Self::Direction(Direction::Up),
        Self::Direction(Direction::Down),
        Self::Direction(Direction::Left),
        Self::Direction(Direction::Right),
        Self::Stop,
        Self::Neck(NeckMove::Up),
        Self::Neck(NeckMove::Down),
        Self::Neck(NeckMove::Left),
        Self::Neck(NeckMove::Right),
        Self::Neck(NeckMove::Reset),
        Self::Mute(MuteState::Muted),
        Self::Mute(MuteState::Unmuted),
    ];

    /// Parses `value` in the context of `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::InvalidCommand`] if `value` is not valid for
    /// `kind`.
    pub fn parse(kind: CommandKind, value: &str) -> Result<Self, ChannelError> {
        match kind {
            CommandKind::Direction => value.parse().map(Self::Direction),
            CommandKind::Stop => match value.trim().to_ascii_uppercase().as_str() {
                "" | "STOP" => Ok(Self::Stop),
                other => Err(ChannelError::InvalidCommand(format!(
                    "unexpected stop value {other:?}"
                ))),
            },
            CommandKind::Neck => value.parse().map(Self::Neck),
            CommandKind::Mute => match value.trim().to_ascii_uppercase().as_str() {
                "" | "MUTE" => Ok(Self::Mute(MuteState::Muted)),
                "UNMUTE" => Ok(Self::Mute(MuteState::Unmuted)),
                other => Err(ChannelError::InvalidCommand(format!(
                    "unknown mute value {other:?}"
                ))),
            },
        }
    }

    /// Looks up the action whose wire method name is `method`.
    #[must_use]
    pub fn from_method(method: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.method() == method)
    }

    /// Returns the command category.
    #[must_use]
    pub const fn kind(self) -> CommandKind {
        match self {
            Self::Direction(_) => CommandKind::Direction,
            Self::Stop => CommandKind::Stop,
            Self::Neck(_) => CommandKind::Neck,
            Self::Mute(_) => CommandKind::Mute,
        }
    }

    /// Canonical upper-case value.
    #[must_use]
    pub const fn value(self) -> &'static str {
        match self {
            Self::Direction(d) => d.value(),
            Self::Stop => "STOP",
            Self::Neck(n) => n.value(),
            Self::Mute(MuteState::Muted) => "MUTE",
            Self::Mute(MuteState::Unmuted) => "UNMUTE",
        }
    }

    /// Wire method name: the lower-cased value.
    #[must_use]
    pub const fn method(self) -> &'static str {
        match self {
            Self::Direction(Direction::Up) => "up",
            Self::Direction(Direction::Down) => "down",
            Self::Direction(Direction::Left) => "left",
            Self::Direction(Direction::Right) => "right",
            Self::Stop => "stop",
            Self::Neck(NeckMove::Up) => "neck_up",
            Self::Neck(NeckMove::Down) => "neck_down",
            Self::Neck(NeckMove::Left) => "neck_left",
            Self::Neck(NeckMove::Right) => "neck_right",
            Self::Neck(NeckMove::Reset) => "neck_reset",
            Self::Mute(MuteState::Muted) => "mute",
            Self::Mute(MuteState::Unmuted) => "unmute",
        }
    }

    /// Numeric command stream used by custom-message transports.
    ///
    /// Direction = 1, stop = 2, neck = 3. Mute has no stream.
    #[must_use]
    pub const fn stream_id(self) -> Option<u8> {
        match self {
            Self::Direction(_) => Some(1),
            Self::Stop => Some(2),
            Self::Neck(_) => Some(3),
            Self::Mute(_) => None,
        }
    }
}

/// An immutable command addressed to a target identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    action: Action,
    target: String,
}

impl Command {
    /// Builds a command from a kind, a string value and a target identity.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::InvalidCommand`] if the value does not fit the
    /// kind or the target identity is blank.
    pub fn new(
        kind: CommandKind,
        value: &str,
        target: impl Into<String>,
    ) -> Result<Self, ChannelError> {
        let action = Action::parse(kind, value)?;
        Self::from_action(action, target)
    }

    /// Builds a command from an already parsed action.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::InvalidCommand`] if the target identity is
    /// blank.
    pub fn from_action(action: Action, target: impl Into<String>) -> Result<Self, ChannelError> {
        let target = target.into();
        if target.trim().is_empty() {
            return Err(ChannelError::InvalidCommand(
                "target identity must not be empty".to_string(),
            ));
        }
        Ok(Self { action, target })
    }

    /// Returns the parsed action.
    #[must_use]
    pub const fn action(&self) -> Action {
        self.action
    }

    /// Returns the command category.
    #[must_use]
    pub const fn kind(&self) -> CommandKind {
        self.action.kind()
    }

    /// Returns the canonical value string.
    #[must_use]
    pub const fn value(&self) -> &'static str {
        self.action.value()
    }

    /// Returns the identity of the peer that should act on this command.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.action.method(), self.target)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn parses_values_case_insensitively() {
        let Ok(cmd) = Command::new(CommandKind::Direction, "up", "robot-1") else {
            panic!("lower-case direction should parse");
        };
        assert_eq!(cmd.action(), Action::Direction(Direction::Up));
        assert_eq!(cmd.value(), "UP");
        assert_eq!(cmd.target(), "robot-1");
    }

    #[test]
    fn neck_accepts_prefixed_and_short_forms() {
        assert_eq!("NECK_RESET".parse::<NeckMove>().ok(), Some(NeckMove::Reset));
        assert_eq!("left".parse::<NeckMove>().ok(), Some(NeckMove::Left));
        assert!("NECK_SPIN".parse::<NeckMove>().is_err());
    }

    #[test]
    fn empty_values_default_for_stop_and_mute() {
        assert_eq!(Action::parse(CommandKind::Stop, "").ok(), Some(Action::Stop));
        assert_eq!(
            Action::parse(CommandKind::Mute, "").ok(),
            Some(Action::Mute(MuteState::Muted))
        );
        assert_eq!(
            Action::parse(CommandKind::Mute, "unmute").ok(),
            Some(Action::Mute(MuteState::Unmuted))
        );
    }

    #[test]
    fn value_must_match_kind() {
        let result = Command::new(CommandKind::Direction, "NECK_UP", "robot-1");
        assert!(matches!(result, Err(ChannelError::InvalidCommand(_))));
        let result = Command::new(CommandKind::Stop, "UP", "robot-1");
        assert!(matches!(result, Err(ChannelError::InvalidCommand(_))));
    }

    #[test]
    fn blank_target_is_rejected() {
        let result = Command::new(CommandKind::Stop, "", "  ");
        assert!(matches!(result, Err(ChannelError::InvalidCommand(_))));
    }

    #[test]
    fn method_round_trips_through_lookup() {
        for action in Action::ALL {
            assert_eq!(Action::from_method(action.method()), Some(action));
            assert_eq!(action.method(), action.value().to_ascii_lowercase());
        }
        assert_eq!(Action::from_method("jump"), None);
    }

    #[test]
    fn stream_ids_follow_command_groups() {
        assert_eq!(Action::Direction(Direction::Left).stream_id(), Some(1));
        assert_eq!(Action::Stop.stream_id(), Some(2));
        assert_eq!(Action::Neck(NeckMove::Reset).stream_id(), Some(3));
        assert_eq!(Action::Mute(MuteState::Muted).stream_id(), None);
    }
}
