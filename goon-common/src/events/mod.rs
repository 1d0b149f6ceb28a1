//! Event types for the goon event system
//!
//! Provides the shared event vocabulary and the EventBus used to publish
//! session views to front ends.

mod playback_types;
mod view_types;

pub use playback_types::{PlaybackState, QueueChangeTrigger};
pub use view_types::{MediaDuration, PlayerView, QueueEntryView, QueueSnapshot};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Player event types
///
/// Every scheduler transition produces one of these. Events are broadcast via
/// EventBus and can be serialized for any UI surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// A session was created in the registry
    SessionOpened {
        session_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A resolved item started playing
    NowPlaying {
        session_id: String,
        view: PlayerView,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback state changed (Idle/Playing/Paused)
    StateChanged {
        session_id: String,
        old_state: PlaybackState,
        new_state: PlaybackState,
        view: PlayerView,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Periodic progress refresh for a playing session
    Progress {
        session_id: String,
        view: PlayerView,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A queued query could not be resolved or started and was dropped
    ///
    /// Transient notice; the session continues with the next item.
    ItemFailed {
        session_id: String,
        query: String,
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Queue contents changed
    QueueChanged {
        session_id: String,
        queue_len: usize,
        trigger: QueueChangeTrigger,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Session torn down (leave or transport disconnect)
    SessionClosed {
        session_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl PlayerEvent {
    /// Session the event belongs to
    pub fn session_id(&self) -> &str {
        match self {
            PlayerEvent::SessionOpened { session_id, .. }
            | PlayerEvent::NowPlaying { session_id, .. }
            | PlayerEvent::StateChanged { session_id, .. }
            | PlayerEvent::Progress { session_id, .. }
            | PlayerEvent::ItemFailed { session_id, .. }
            | PlayerEvent::QueueChanged { session_id, .. }
            | PlayerEvent::SessionClosed { session_id, .. } => session_id,
        }
    }

    /// Short event name for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            PlayerEvent::SessionOpened { .. } => "SessionOpened",
            PlayerEvent::NowPlaying { .. } => "NowPlaying",
            PlayerEvent::StateChanged { .. } => "StateChanged",
            PlayerEvent::Progress { .. } => "Progress",
            PlayerEvent::ItemFailed { .. } => "ItemFailed",
            PlayerEvent::QueueChanged { .. } => "QueueChanged",
            PlayerEvent::SessionClosed { .. } => "SessionClosed",
        }
    }
}

/// Fan-out of player events to front ends
///
/// Backed by a `tokio::broadcast` channel. Publishing never waits on a
/// receiver; a receiver that falls more than `capacity` events behind gets
/// `RecvError::Lagged` and skips ahead.
///
/// # Examples
///
/// ```
/// use goon_common::events::{EventBus, PlayerEvent};
///
/// let bus = EventBus::new(16);
/// let mut rx = bus.subscribe();
///
/// bus.emit_lossy(PlayerEvent::SessionOpened {
///     session_id: "guild-1".to_string(),
///     timestamp: chrono::Utc::now(),
/// });
///
/// let event = rx.try_recv().unwrap();
/// assert_eq!(event.session_id(), "guild-1");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
    capacity: usize,
}

impl EventBus {
    /// Bus buffering up to `capacity` events per receiver
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Receiver for events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    /// Publish to every receiver, returning how many got it
    ///
    /// `Err` hands the event back when there is no receiver.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: PlayerEvent,
    ) -> Result<usize, broadcast::error::SendError<PlayerEvent>> {
        self.tx.send(event)
    }

    /// Publish, dropping the event when there is no receiver
    pub fn emit_lossy(&self, event: PlayerEvent) {
        let _ = self.tx.send(event);
    }

    /// Live receivers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
