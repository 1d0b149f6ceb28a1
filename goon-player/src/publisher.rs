//! View publishing seam
//!
//! The scheduler reports every transition through a `ViewPublisher`; how the
//! view is rendered is up to the front end.

use goon_common::events::{EventBus, PlayerEvent};
use tracing::trace;

/// Receives player events from sessions and the progress sweep
///
/// Called while no session lock is held. Implementations must not block.
pub trait ViewPublisher: Send + Sync {
    fn publish(&self, event: PlayerEvent);
}

impl ViewPublisher for EventBus {
    fn publish(&self, event: PlayerEvent) {
        trace!(
            session = %event.session_id(),
            event = event.event_type(),
            subscribers = self.subscriber_count(),
            "Publishing player event"
        );
        // Dropped when nobody is listening
        self.emit_lossy(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_bus_publishes_to_subscribers() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let publisher: &dyn ViewPublisher = &bus;

        publisher.publish(PlayerEvent::SessionClosed {
            session_id: "guild-7".to_string(),
            timestamp: chrono::Utc::now(),
        });

        let event = rx.try_recv().unwrap();
        assert_eq!(event.event_type(), "SessionClosed");
        assert_eq!(event.session_id(), "guild-7");
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let bus = EventBus::new(8);
        bus.publish(PlayerEvent::SessionOpened {
            session_id: "guild-7".to_string(),
            timestamp: chrono::Utc::now(),
        });
    }
}
