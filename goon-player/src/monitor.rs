//! Periodic progress refresh
//!
//! Every interval, samples each playing session's view and publishes a
//! `Progress` event. Read-only: never mutates playback state. Sessions
//! removed mid-sweep are skipped.

use crate::publisher::ViewPublisher;
use crate::registry::SessionRegistry;
use goon_common::events::{PlaybackState, PlayerEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

/// Start the sweep task; it runs until `cancel` fires
pub fn start_progress_sweep(
    registry: Arc<SessionRegistry>,
    publisher: Arc<dyn ViewPublisher>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "Progress sweep started");

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let published = sweep_once(&registry, publisher.as_ref()).await;
                    trace!(published, "Progress sweep tick");
                }
            }
        }

        info!("Progress sweep stopped");
    })
}

/// One pass over the registry; returns how many views were published
pub async fn sweep_once(registry: &SessionRegistry, publisher: &dyn ViewPublisher) -> usize {
    let mut published = 0;

    for session_id in registry.list_active().await {
        let Some(session) = registry.get(&session_id).await else {
            debug!(session = %session_id, "Session gone during sweep");
            continue;
        };

        let view = session.current_view().await;
        if view.state != PlaybackState::Playing {
            continue;
        }

        publisher.publish(PlayerEvent::Progress {
            session_id,
            view,
            timestamp: chrono::Utc::now(),
        });
        published += 1;
    }

    published
}
