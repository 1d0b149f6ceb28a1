//! View types rendered by front ends
//!
//! These are read-only projections of a session. Producing them never
//! mutates playback state.

use super::PlaybackState;
use serde::{Deserialize, Serialize};

/// Track duration as reported by the resolver
///
/// Resolvers report `0` when the length is not known (live streams, some
/// search results). Front ends render `Unknown` as an indeterminate indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "secs", rename_all = "lowercase")]
pub enum MediaDuration {
    Known(u64),
    Unknown,
}

impl MediaDuration {
    pub fn from_secs(secs: u64) -> Self {
        if secs == 0 {
            MediaDuration::Unknown
        } else {
            MediaDuration::Known(secs)
        }
    }

    pub fn secs(self) -> Option<u64> {
        match self {
            MediaDuration::Known(s) => Some(s),
            MediaDuration::Unknown => None,
        }
    }
}

/// Snapshot of one session for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub session_id: String,
    pub state: PlaybackState,
    /// Title of the current item (None when idle)
    pub title: Option<String>,
    /// Elapsed play time in seconds, pause time excluded
    pub elapsed_secs: f64,
    pub duration: MediaDuration,
    /// Fraction in `[0, 1]`, None when idle or duration unknown
    pub progress: Option<f64>,
    pub thumbnail_url: Option<String>,
    pub stream_locator: Option<String>,
    /// Number of queries waiting behind the current item
    pub queue_len: usize,
    /// Query currently being resolved, if any
    pub pending: Option<String>,
}

impl PlayerView {
    /// View of a session with nothing loaded
    pub fn idle(session_id: impl Into<String>, queue_len: usize) -> Self {
        Self {
            session_id: session_id.into(),
            state: PlaybackState::Idle,
            title: None,
            elapsed_secs: 0.0,
            duration: MediaDuration::Unknown,
            progress: None,
            thumbnail_url: None,
            stream_locator: None,
            queue_len,
            pending: None,
        }
    }
}

/// One queued query as shown to users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntryView {
    /// 0 = next to play
    pub position: usize,
    pub query: String,
    /// Best-effort title from earlier resolutions of the same query
    pub title: Option<String>,
}

/// Bounded window over a session queue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub entries: Vec<QueueEntryView>,
    /// Total queue length (may exceed `entries.len()`)
    pub total: usize,
}
