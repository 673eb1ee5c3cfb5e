//! Directional control pad.
//!
//! Turns raw button edges into commands. A direction button issues its
//! movement once on the press edge and a single stop on the release edge,
//! however the edges repeat.

use std::sync::Arc;

use tokio::sync::Mutex;

use super::command_channel::{CommandChannel, DeliveryMode, PendingCommand};
use crate::domain::{Action, Command, Direction, MuteState, NeckMove};
use crate::error::ChannelError;

/// Debounce state for the direction buttons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PadState {
    held: Option<Direction>,
}

impl PadState {
    /// Records a press edge. Returns the direction to issue, if any.
    pub fn press(&mut self, direction: Direction) -> Option<Direction> {
        if self.held.is_some() {
            return None;
        }
        self.held = Some(direction);
        Some(direction)
    }

    /// Records a release edge. Returns `true` if a stop should be issued.
    pub fn release(&mut self, direction: Direction) -> bool {
        if self.held == Some(direction) {
            self.held = None;
            true
        } else {
            false
        }
    }

    /// Records a cancelled gesture. Returns `true` if a stop should be issued.
    pub fn cancel(&mut self) -> bool {
        self.held.take().is_some()
    }

    /// Returns the direction currently held down.
    #[must_use]
    pub const fn held(&self) -> Option<Direction> {
        self.held
    }
}

/// Button surface bound to one channel and one target.
///
/// Direction edges are debounced through [`PadState`]. Stop, neck and mute
/// buttons issue on every click.
#[derive(Debug)]
pub struct ControlPad {
    channel: Arc<CommandChannel>,
    target: String,
    mode: DeliveryMode,
    pad: Mutex<PadState>,
    muted: Mutex<bool>,
}

impl ControlPad {
    /// Creates a pad that sends to `target` with the given delivery mode.
    #[must_use]
    pub fn new(channel: Arc<CommandChannel>, target: impl Into<String>, mode: DeliveryMode) -> Self {
        Self {
            channel,
            target: target.into(),
            mode,
            pad: Mutex::new(PadState::default()),
            muted: Mutex::new(false),
        }
    }

    /// Handles a direction button going down.
    ///
    /// Returns `None` when another direction is already held.
    ///
    /// # Errors
    ///
    /// Returns any error [`CommandChannel::submit`] returns.
    pub async fn on_press_edge(
        &self,
        direction: Direction,
    ) -> Result<Option<PendingCommand>, ChannelError> {
        let mut pad = self.pad.lock().await;
        let Some(direction) = pad.press(direction) else {
            tracing::trace!(%direction, "press ignored, a direction is held");
            return Ok(None);
        };
        // The pad stays locked until the command is handed off, so a release
        // cannot overtake its press.
        self.submit(Action::Direction(direction)).await.map(Some)
    }

    /// Handles a direction button going up.
    ///
    /// Returns `None` unless `direction` is the one held.
    ///
    /// # Errors
    ///
    /// Returns any error [`CommandChannel::submit`] returns.
    pub async fn on_release_edge(
        &self,
        direction: Direction,
    ) -> Result<Option<PendingCommand>, ChannelError> {
        let mut pad = self.pad.lock().await;
        if !pad.release(direction) {
            tracing::trace!(%direction, "release ignored, direction not held");
            return Ok(None);
        }
        self.submit(Action::Stop).await.map(Some)
    }

    /// Handles a gesture the input layer cancelled, e.g. focus loss.
    ///
    /// # Errors
    ///
    /// Returns any error [`CommandChannel::submit`] returns.
    pub async fn on_cancel(&self) -> Result<Option<PendingCommand>, ChannelError> {
        let mut pad = self.pad.lock().await;
        if !pad.cancel() {
            return Ok(None);
        }
        self.submit(Action::Stop).await.map(Some)
    }

    /// Explicit stop button. Always issues and clears any held direction.
    ///
    /// # Errors
    ///
    /// Returns any error [`CommandChannel::submit`] returns.
    pub async fn stop(&self) -> Result<PendingCommand, ChannelError> {
        let mut pad = self.pad.lock().await;
        pad.cancel();
        self.submit(Action::Stop).await
    }

    /// Neck button.
    ///
    /// # Errors
    ///
    /// Returns any error [`CommandChannel::submit`] returns.
    pub async fn neck(&self, movement: NeckMove) -> Result<PendingCommand, ChannelError> {
        self.submit(Action::Neck(movement)).await
    }

    /// Mute button: requests the opposite of the current mute state and
    /// waits for the outcome. The local flag only changes on success.
    ///
    /// # Errors
    ///
    /// Returns the command's error; the flag is left unchanged.
    pub async fn toggle_mute(&self) -> Result<MuteState, ChannelError> {
        let mut muted = self.muted.lock().await;
        let next = if *muted {
            MuteState::Unmuted
        } else {
            MuteState::Muted
        };
        self.apply_mute(&mut muted, next).await
    }

    /// Requests an explicit mute state and waits for the outcome. The local
    /// flag only changes on success.
    ///
    /// # Errors
    ///
    /// Returns the command's error; the flag is left unchanged.
    pub async fn set_mute(&self, state: MuteState) -> Result<MuteState, ChannelError> {
        let mut muted = self.muted.lock().await;
        self.apply_mute(&mut muted, state).await
    }

    /// Returns the local mute flag.
    pub async fn is_muted(&self) -> bool {
        *self.muted.lock().await
    }

    /// Returns the direction currently held down.
    pub async fn held(&self) -> Option<Direction> {
        self.pad.lock().await.held()
    }

    /// Returns the channel this pad sends through.
    #[must_use]
    pub const fn channel(&self) -> &Arc<CommandChannel> {
        &self.channel
    }

    async fn apply_mute(
        &self,
        muted: &mut bool,
        state: MuteState,
    ) -> Result<MuteState, ChannelError> {
        self.submit(Action::Mute(state)).await?.await?;
        *muted = state == MuteState::Muted;
        tracing::info!(target_identity = %self.target, ?state, "mute state applied");
        Ok(state)
    }

    async fn submit(&self, action: Action) -> Result<PendingCommand, ChannelError> {
        let command = Command::from_action(action, self.target.as_str())?;
        self.channel.submit(command, self.mode).await
    }
}
