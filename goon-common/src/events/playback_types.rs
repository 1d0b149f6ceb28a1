//! Playback-related type definitions
//!
//! Supporting types for session state and queue changes.

use serde::{Deserialize, Serialize};

/// Playback state of one session
///
/// `Idle` means nothing is loaded. A session returns to `Idle` whenever its
/// queue drains and can re-enter `Playing` at any time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Paused,
}

impl PlaybackState {
    /// True while an item is loaded (playing or paused)
    pub fn is_active(self) -> bool {
        !matches!(self, PlaybackState::Idle)
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
        }
    }
}

/// Why the queue changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum QueueChangeTrigger {
    /// A query was appended by a front end
    UserEnqueue,
    /// Remaining entries were permuted
    Shuffle,
    /// Queue emptied by stop/leave
    Clear,
    /// Head popped by the advance transition
    Advance,
}

impl std::fmt::Display for QueueChangeTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueChangeTrigger::UserEnqueue => write!(f, "UserEnqueue"),
            QueueChangeTrigger::Shuffle => write!(f, "Shuffle"),
            QueueChangeTrigger::Clear => write!(f, "Clear"),
            QueueChangeTrigger::Advance => write!(f, "Advance"),
        }
    }
}
