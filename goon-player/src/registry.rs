//! Session registry
//!
//! Process-wide map from session id to its `PlaybackSession`. Sessions are
//! created lazily on first use and torn down on leave or transport
//! disconnect. Exactly one live session exists per id.
//!
//! The by-id wrappers below are the surface front ends call; an absent
//! session answers with a no-op instead of creating one.

use crate::playback::{
    ControlOutcome, EnqueueOutcome, NoOpReason, PlaybackSession, Query, SessionDeps,
    ShuffleOutcome,
};
use goon_common::events::{PlaybackState, PlayerEvent, PlayerView, QueueSnapshot};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Registry of live playback sessions
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<PlaybackSession>>>,
    deps: SessionDeps,
}

impl SessionRegistry {
    pub fn new(deps: SessionDeps) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            deps,
        }
    }

    pub fn deps(&self) -> &SessionDeps {
        &self.deps
    }

    /// Existing session for `session_id`, or a freshly spawned one
    pub async fn get_or_create(&self, session_id: &str) -> Arc<PlaybackSession> {
        if let Some(session) = self.sessions.read().await.get(session_id) {
            return session.clone();
        }

        let mut sessions = self.sessions.write().await;
        // Another caller may have won the race between the two locks
        if let Some(session) = sessions.get(session_id) {
            return session.clone();
        }

        let session = PlaybackSession::spawn(session_id, self.deps.clone());
        sessions.insert(session_id.to_string(), session.clone());
        drop(sessions);

        info!(session = %session_id, "Session opened");
        self.deps.publisher.publish(PlayerEvent::SessionOpened {
            session_id: session_id.to_string(),
            timestamp: chrono::Utc::now(),
        });
        session
    }

    pub async fn get(&self, session_id: &str) -> Option<Arc<PlaybackSession>> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Shut the session down and drop it; returns whether it existed
    pub async fn remove(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(session_id);
        match removed {
            Some(session) => {
                session.shutdown().await;
                info!(session = %session_id, "Session removed");
                true
            }
            None => {
                debug!(session = %session_id, "Remove for unknown session");
                false
            }
        }
    }

    /// Transport reported the connection gone (kicked, channel deleted)
    pub async fn on_transport_disconnected(&self, session_id: &str) -> bool {
        info!(session = %session_id, "Transport disconnected");
        self.remove(session_id).await
    }

    /// Ids of all live sessions, sorted
    pub async fn list_active(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Tear down every session (process exit)
    pub async fn shutdown_all(&self) {
        let drained: Vec<(String, Arc<PlaybackSession>)> =
            self.sessions.write().await.drain().collect();
        let count = drained.len();

        for (_, session) in drained {
            session.shutdown().await;
        }
        info!(count, "All sessions shut down");
    }

    // ========================================
    // By-id front-end surface
    // ========================================

    pub async fn enqueue(&self, session_id: &str, query: impl Into<Query>) -> EnqueueOutcome {
        self.get_or_create(session_id).await.enqueue(query.into()).await
    }

    pub async fn pause(&self, session_id: &str) -> ControlOutcome {
        match self.get(session_id).await {
            Some(session) => session.pause().await,
            None => ControlOutcome::NoOp(NoOpReason::NoSession),
        }
    }

    pub async fn resume(&self, session_id: &str) -> ControlOutcome {
        match self.get(session_id).await {
            Some(session) => session.resume().await,
            None => ControlOutcome::NoOp(NoOpReason::NoSession),
        }
    }

    pub async fn skip(&self, session_id: &str) -> ControlOutcome {
        match self.get(session_id).await {
            Some(session) => session.skip().await,
            None => ControlOutcome::NoOp(NoOpReason::NoSession),
        }
    }

    pub async fn stop(&self, session_id: &str) -> ControlOutcome {
        match self.get(session_id).await {
            Some(session) => session.stop().await,
            None => ControlOutcome::NoOp(NoOpReason::NoSession),
        }
    }

    pub async fn shuffle(&self, session_id: &str) -> ShuffleOutcome {
        match self.get(session_id).await {
            Some(session) => session.shuffle().await,
            None => ShuffleOutcome::Insufficient,
        }
    }

    pub async fn queue_snapshot(&self, session_id: &str, limit: usize) -> QueueSnapshot {
        match self.get(session_id).await {
            Some(session) => session.queue_snapshot(limit).await,
            None => QueueSnapshot::default(),
        }
    }

    pub async fn current_view(&self, session_id: &str) -> PlayerView {
        match self.get(session_id).await {
            Some(session) => session.current_view().await,
            None => PlayerView::idle(session_id, 0),
        }
    }

    pub async fn state(&self, session_id: &str) -> PlaybackState {
        match self.get(session_id).await {
            Some(session) => session.state().await,
            None => PlaybackState::Idle,
        }
    }

    /// Transport completion for a session's current item
    pub async fn on_finished(&self, session_id: &str, error: Option<String>) {
        match self.get(session_id).await {
            Some(session) => session.notify_finished(error).await,
            None => debug!(session = %session_id, "Completion for unknown session ignored"),
        }
    }
}
