//! Playback session state machine
//!
//! One `PlaybackSession` per group session. All mutations of queue, current
//! item, state, and clock happen under the session's mutex, and the lock is
//! never held across resolver or transport calls.
//!
//! **Advance:** the transition that pops and starts the next item runs only
//! on the session's driver task. Enqueue-while-idle and transport completions
//! are messages to that task, so at most one item is ever "now playing".
//!
//! **States:** Idle <-> Playing <-> Paused. `current` is `Some` exactly when
//! the state is Playing or Paused.

use super::progress::{progress_fraction, ProgressClock};
use super::queue::{Query, Queue, ShuffleOutcome};
use super::transport::{CompletionHandle, PlayRequest, Transport};
use crate::error::ResolveError;
use crate::publisher::ViewPublisher;
use crate::resolver::{MediaItem, RetryingResolver};
use goon_common::config::PlaybackConfig;
use goon_common::events::{
    MediaDuration, PlaybackState, PlayerEvent, PlayerView, QueueChangeTrigger, QueueEntryView,
    QueueSnapshot,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Upper bound on waiting for the transport to stop a stream
const TRANSPORT_STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Entries kept in the resolved-title cache before it is reset
const TITLE_CACHE_LIMIT: usize = 512;

/// Messages to the session driver task
#[derive(Debug)]
pub(crate) enum DriverMsg {
    /// Queue gained an entry while idle
    Kick,
    /// Transport reported the end of the item started as `generation`
    Finished {
        generation: u64,
        error: Option<String>,
    },
}

/// Per-session playback settings
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Reject enqueues beyond this many waiting queries
    pub max_queue_len: Option<usize>,
    pub volume: f32,
    pub stream_options: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&PlaybackConfig::default())
    }
}

impl From<&PlaybackConfig> for SessionSettings {
    fn from(config: &PlaybackConfig) -> Self {
        Self {
            max_queue_len: config.max_queue_len,
            volume: config.volume,
            stream_options: config.stream_options.clone(),
        }
    }
}

/// Collaborators shared by every session
#[derive(Clone)]
pub struct SessionDeps {
    pub resolver: Arc<RetryingResolver>,
    pub transport: Arc<dyn Transport>,
    pub publisher: Arc<dyn ViewPublisher>,
    pub settings: SessionSettings,
}

/// Result of an enqueue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Session was idle; this query is resolved and played next
    NowPlaying,
    /// Waiting behind the current item (0 = next up)
    Queued { position: usize },
    /// Queue is at its configured maximum
    Rejected { limit: usize },
    /// Session was torn down
    Closed,
}

/// Why a control command had no effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoOpReason {
    NothingToPause,
    NothingToResume,
    NothingToSkip,
    NothingToStop,
    NoSession,
}

impl fmt::Display for NoOpReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoOpReason::NothingToPause => write!(f, "No audio is playing."),
            NoOpReason::NothingToResume => write!(f, "The audio is not paused."),
            NoOpReason::NothingToSkip => write!(f, "Nothing to skip, no audio is playing."),
            NoOpReason::NothingToStop => write!(f, "Nothing to stop, no audio is playing."),
            NoOpReason::NoSession => write!(f, "The bot is not connected to a voice channel."),
        }
    }
}

/// Result of pause/resume/skip/stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    Applied,
    NoOp(NoOpReason),
}

impl ControlOutcome {
    pub fn is_applied(self) -> bool {
        matches!(self, ControlOutcome::Applied)
    }
}

/// Mutable session state, guarded by the session mutex
#[derive(Debug, Default)]
struct SessionInner {
    queue: Queue,
    current: Option<MediaItem>,
    state: PlaybackState,
    clock: ProgressClock,
    /// Bumped for every started item and on shutdown
    generation: u64,
    /// Query being resolved or started by the driver
    resolving: Option<Query>,
    /// Set from the moment an advance is scheduled until it starts an item
    /// or drains the queue. Stop cancels it.
    advance_cancel: Option<CancellationToken>,
    /// Best-effort titles of previously resolved queries
    titles: HashMap<Query, String>,
    closed: bool,
}

impl SessionInner {
    fn remember_title(&mut self, query: &Query, title: &str) {
        if self.titles.len() >= TITLE_CACHE_LIMIT {
            self.titles.clear();
        }
        self.titles.insert(query.clone(), title.to_string());
    }

    /// An advance is scheduled or running and has not been stopped
    fn advance_pending(&self) -> bool {
        self.advance_cancel
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }

    fn finish_advance(&mut self) {
        self.resolving = None;
        self.advance_cancel = None;
    }
}

/// Playback scheduler for one session
pub struct PlaybackSession {
    id: String,
    /// Distinguishes successive sessions created for the same id
    instance_id: Uuid,
    inner: Mutex<SessionInner>,
    /// Serializes pause/resume/skip/stop including their transport calls
    commands: Mutex<()>,
    deps: SessionDeps,
    tx: mpsc::UnboundedSender<DriverMsg>,
    cancel: CancellationToken,
}

impl PlaybackSession {
    /// Create a session and start its driver task
    ///
    /// Must be called inside a tokio runtime.
    pub fn spawn(id: impl Into<String>, deps: SessionDeps) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Arc::new(Self {
            id: id.into(),
            instance_id: Uuid::new_v4(),
            inner: Mutex::new(SessionInner::default()),
            commands: Mutex::new(()),
            deps,
            tx,
            cancel: CancellationToken::new(),
        });

        tokio::spawn(run_driver(
            Arc::downgrade(&session),
            rx,
            session.cancel.clone(),
        ));

        info!(session = %session.id, instance = %session.instance_id, "Playback session created");
        session
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub async fn state(&self) -> PlaybackState {
        self.inner.lock().await.state
    }

    pub async fn is_closed(&self) -> bool {
        self.inner.lock().await.closed
    }

    /// Elapsed play time of the current item, pause time excluded
    pub async fn elapsed(&self) -> Duration {
        self.inner.lock().await.clock.elapsed()
    }

    // ========================================
    // Front-end operations
    // ========================================

    /// Append a query; starts playback if the session is idle
    pub async fn enqueue(&self, query: Query) -> EnqueueOutcome {
        let (outcome, kick, queue_len) = {
            let mut inner = self.inner.lock().await;
            if inner.closed {
                return EnqueueOutcome::Closed;
            }
            if let Some(limit) = self.deps.settings.max_queue_len {
                if inner.queue.len() >= limit {
                    debug!(session = %self.id, limit, "Queue full, rejecting enqueue");
                    return EnqueueOutcome::Rejected { limit };
                }
            }

            let idle = !inner.state.is_active() && !inner.advance_pending();
            let was_empty = inner.queue.is_empty();
            inner.queue.enqueue(query.clone());

            let outcome = if idle && was_empty {
                EnqueueOutcome::NowPlaying
            } else {
                EnqueueOutcome::Queued {
                    position: inner.queue.len() - 1,
                }
            };
            if idle {
                inner.advance_cancel = Some(self.cancel.child_token());
            }
            (outcome, idle, inner.queue.len())
        };

        info!(session = %self.id, query = %query, ?outcome, "Enqueued");
        self.publish_queue_changed(queue_len, QueueChangeTrigger::UserEnqueue);

        if kick && self.tx.send(DriverMsg::Kick).is_err() {
            warn!(session = %self.id, "Driver gone, enqueue will not start playback");
        }
        outcome
    }

    /// Pause the current item (Playing only)
    pub async fn pause(&self) -> ControlOutcome {
        let _command = self.commands.lock().await;
        let view = {
            let mut inner = self.inner.lock().await;
            if inner.state != PlaybackState::Playing {
                return ControlOutcome::NoOp(NoOpReason::NothingToPause);
            }
            inner.clock.pause(Instant::now());
            inner.state = PlaybackState::Paused;
            self.view_of(&inner)
        };

        self.deps.transport.pause(&self.id).await;
        info!(session = %self.id, elapsed_secs = view.elapsed_secs, "Paused");
        self.publish_state(PlaybackState::Playing, PlaybackState::Paused, view);
        ControlOutcome::Applied
    }

    /// Resume a paused item (Paused only)
    pub async fn resume(&self) -> ControlOutcome {
        let _command = self.commands.lock().await;
        let view = {
            let mut inner = self.inner.lock().await;
            if inner.state != PlaybackState::Paused {
                return ControlOutcome::NoOp(NoOpReason::NothingToResume);
            }
            inner.clock.resume(Instant::now());
            inner.state = PlaybackState::Playing;
            self.view_of(&inner)
        };

        self.deps.transport.resume(&self.id).await;
        info!(session = %self.id, elapsed_secs = view.elapsed_secs, "Resumed");
        self.publish_state(PlaybackState::Paused, PlaybackState::Playing, view);
        ControlOutcome::Applied
    }

    /// Stop the current item; its completion advances to the next one
    pub async fn skip(&self) -> ControlOutcome {
        let _command = self.commands.lock().await;
        let title = {
            let inner = self.inner.lock().await;
            match &inner.current {
                Some(item) if inner.state.is_active() => item.title.clone(),
                _ => return ControlOutcome::NoOp(NoOpReason::NothingToSkip),
            }
        };

        info!(session = %self.id, title = %title, "Skipping current item");
        self.stop_transport().await;
        ControlOutcome::Applied
    }

    /// Clear the queue and stop the current item
    ///
    /// While idle with an advance scheduled or resolving, cancels it so
    /// nothing further is started.
    pub async fn stop(&self) -> ControlOutcome {
        let _command = self.commands.lock().await;
        let (was_playing, cleared) = {
            let mut inner = self.inner.lock().await;
            if inner.state.is_active() {
                (true, inner.queue.clear())
            } else if inner.advance_pending() {
                if let Some(token) = inner.advance_cancel.as_ref() {
                    token.cancel();
                }
                (false, inner.queue.clear())
            } else {
                return ControlOutcome::NoOp(NoOpReason::NothingToStop);
            }
        };

        info!(session = %self.id, cleared, was_playing, "Stopping playback");
        if cleared > 0 {
            self.publish_queue_changed(0, QueueChangeTrigger::Clear);
        }
        if was_playing {
            self.stop_transport().await;
        }
        ControlOutcome::Applied
    }

    /// Randomly permute the waiting queries
    pub async fn shuffle(&self) -> ShuffleOutcome {
        let (outcome, queue_len) = {
            let mut inner = self.inner.lock().await;
            let outcome = inner.queue.shuffle();
            (outcome, inner.queue.len())
        };

        if outcome == ShuffleOutcome::Shuffled {
            info!(session = %self.id, queue_len, "Queue shuffled");
            self.publish_queue_changed(queue_len, QueueChangeTrigger::Shuffle);
        }
        outcome
    }

    /// Up to `limit` waiting queries, with titles already known from earlier
    /// resolutions. Never resolves anything itself.
    pub async fn queue_snapshot(&self, limit: usize) -> QueueSnapshot {
        let inner = self.inner.lock().await;
        let entries = inner
            .queue
            .window(limit)
            .into_iter()
            .enumerate()
            .map(|(position, query)| QueueEntryView {
                position,
                query: query.to_string(),
                title: inner.titles.get(query).cloned(),
            })
            .collect();

        QueueSnapshot {
            entries,
            total: inner.queue.len(),
        }
    }

    pub async fn current_view(&self) -> PlayerView {
        let inner = self.inner.lock().await;
        self.view_of(&inner)
    }

    /// Transport-side completion for whatever is playing now
    ///
    /// Prefer firing the `CompletionHandle` given to `Transport::play`; this
    /// entry point serves transports that only know the session id.
    pub async fn notify_finished(&self, error: Option<String>) {
        let generation = self.inner.lock().await.generation;
        if self
            .tx
            .send(DriverMsg::Finished { generation, error })
            .is_err()
        {
            debug!(session = %self.id, "Completion for closed session ignored");
        }
    }

    /// Tear the session down
    ///
    /// Safe at any time, including mid-resolution or mid-retry-sleep: cancels
    /// outstanding work, clears the queue, drops the current item, and makes
    /// the session Idle. Idempotent.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let _command = self.commands.lock().await;

        let was_active = {
            let mut inner = self.inner.lock().await;
            if inner.closed {
                return;
            }
            inner.closed = true;
            inner.queue.clear();
            let was_active = inner.state.is_active();
            inner.current = None;
            inner.state = PlaybackState::Idle;
            inner.clock.reset();
            inner.generation += 1;
            inner.finish_advance();
            was_active
        };

        if was_active {
            self.stop_transport().await;
        }

        info!(session = %self.id, instance = %self.instance_id, "Playback session shut down");
        self.deps.publisher.publish(PlayerEvent::SessionClosed {
            session_id: self.id.clone(),
            timestamp: chrono::Utc::now(),
        });
    }

    // ========================================
    // Driver side
    // ========================================

    async fn handle(&self, msg: DriverMsg) {
        let previous = match msg {
            DriverMsg::Kick => {
                let inner = self.inner.lock().await;
                if inner.closed || inner.state.is_active() || inner.resolving.is_some() {
                    return;
                }
                PlaybackState::Idle
            }
            DriverMsg::Finished { generation, error } => {
                let mut inner = self.inner.lock().await;
                if inner.closed || generation != inner.generation || inner.current.is_none() {
                    debug!(
                        session = %self.id,
                        generation,
                        current_generation = inner.generation,
                        "Ignoring stale completion"
                    );
                    return;
                }
                let finished = inner.current.take();
                let previous = inner.state;
                inner.state = PlaybackState::Idle;
                inner.clock.reset();
                inner.advance_cancel = Some(self.cancel.child_token());
                drop(inner);

                let title = finished.map(|item| item.title).unwrap_or_default();
                match error {
                    Some(cause) => {
                        warn!(session = %self.id, title = %title, cause = %cause, "Playback ended with transport error")
                    }
                    None => info!(session = %self.id, title = %title, "Playback finished"),
                }
                previous
            }
        };

        self.advance(previous).await;
    }

    /// Pop and start queued items until one plays or the queue drains
    ///
    /// Failed items are dropped, never re-queued. Runs on the driver task only.
    async fn advance(&self, previous: PlaybackState) {
        loop {
            let (query, token, remaining) = {
                let mut inner = self.inner.lock().await;
                if inner.closed {
                    return;
                }
                match inner.queue.pop_front() {
                    Some(query) => {
                        let token = match inner.advance_cancel.clone() {
                            Some(token) if !token.is_cancelled() => token,
                            _ => {
                                let token = self.cancel.child_token();
                                inner.advance_cancel = Some(token.clone());
                                token
                            }
                        };
                        inner.resolving = Some(query.clone());
                        (query, token, inner.queue.len())
                    }
                    None => {
                        inner.finish_advance();
                        let view = self.view_of(&inner);
                        drop(inner);
                        if previous != PlaybackState::Idle {
                            info!(session = %self.id, "Queue drained, session idle");
                            self.publish_state(previous, PlaybackState::Idle, view);
                        }
                        return;
                    }
                }
            };

            self.publish_queue_changed(remaining, QueueChangeTrigger::Advance);
            debug!(session = %self.id, query = %query, remaining, "Resolving next item");

            let item = match self.deps.resolver.resolve(&query, &token).await {
                Ok(item) => item,
                Err(ResolveError::Cancelled) => {
                    self.inner.lock().await.resolving = None;
                    info!(session = %self.id, query = %query, "Resolution cancelled");
                    continue;
                }
                Err(e) => {
                    self.inner.lock().await.resolving = None;
                    warn!(session = %self.id, query = %query, error = %e, "Dropping item after failed resolution");
                    self.publish_item_failed(&query, e.to_string());
                    continue;
                }
            };

            let generation = {
                let mut inner = self.inner.lock().await;
                if inner.closed || token.is_cancelled() {
                    inner.resolving = None;
                    info!(session = %self.id, query = %query, "Discarding resolved item, session was stopped");
                    continue;
                }
                inner.generation += 1;
                inner.generation
            };

            let handle = CompletionHandle::new(self.id.clone(), generation, self.tx.clone());
            let request = PlayRequest {
                item: item.clone(),
                volume: self.deps.settings.volume,
                stream_options: self.deps.settings.stream_options.clone(),
            };

            if let Err(e) = self.deps.transport.play(&self.id, request, handle).await {
                self.inner.lock().await.resolving = None;
                error!(session = %self.id, title = %item.title, error = %e, "Transport failed to start item");
                self.publish_item_failed(&query, e.to_string());
                continue;
            }

            let view = {
                let mut inner = self.inner.lock().await;
                if inner.closed || token.is_cancelled() {
                    inner.resolving = None;
                    drop(inner);
                    info!(session = %self.id, query = %query, "Session stopped while starting item");
                    self.stop_transport().await;
                    continue;
                }
                inner.finish_advance();
                inner.remember_title(&query, &item.title);
                inner.current = Some(item);
                inner.state = PlaybackState::Playing;
                inner.clock.start(Instant::now());
                self.view_of(&inner)
            };

            info!(
                session = %self.id,
                title = view.title.as_deref().unwrap_or_default(),
                generation,
                "Now playing"
            );
            self.deps.publisher.publish(PlayerEvent::NowPlaying {
                session_id: self.id.clone(),
                view: view.clone(),
                timestamp: chrono::Utc::now(),
            });
            if previous != PlaybackState::Playing {
                self.publish_state(previous, PlaybackState::Playing, view);
            }
            return;
        }
    }

    async fn stop_transport(&self) {
        if tokio::time::timeout(TRANSPORT_STOP_TIMEOUT, self.deps.transport.stop(&self.id))
            .await
            .is_err()
        {
            warn!(session = %self.id, "Transport stop timed out");
        }
    }

    fn view_of(&self, inner: &SessionInner) -> PlayerView {
        let pending = inner.resolving.as_ref().map(|q| q.to_string());
        match &inner.current {
            None => PlayerView {
                pending,
                ..PlayerView::idle(&self.id, inner.queue.len())
            },
            Some(item) => {
                let elapsed = inner.clock.elapsed();
                PlayerView {
                    session_id: self.id.clone(),
                    state: inner.state,
                    title: Some(item.title.clone()),
                    elapsed_secs: elapsed.as_secs_f64(),
                    duration: MediaDuration::from_secs(item.duration_secs),
                    progress: progress_fraction(elapsed, item.duration_secs),
                    thumbnail_url: item.thumbnail_url.clone(),
                    stream_locator: Some(item.stream_locator.clone()),
                    queue_len: inner.queue.len(),
                    pending,
                }
            }
        }
    }

    fn publish_state(&self, old_state: PlaybackState, new_state: PlaybackState, view: PlayerView) {
        self.deps.publisher.publish(PlayerEvent::StateChanged {
            session_id: self.id.clone(),
            old_state,
            new_state,
            view,
            timestamp: chrono::Utc::now(),
        });
    }

    fn publish_queue_changed(&self, queue_len: usize, trigger: QueueChangeTrigger) {
        self.deps.publisher.publish(PlayerEvent::QueueChanged {
            session_id: self.id.clone(),
            queue_len,
            trigger,
            timestamp: chrono::Utc::now(),
        });
    }

    fn publish_item_failed(&self, query: &Query, reason: String) {
        self.deps.publisher.publish(PlayerEvent::ItemFailed {
            session_id: self.id.clone(),
            query: query.to_string(),
            reason,
            timestamp: chrono::Utc::now(),
        });
    }
}

/// Session driver: the only task that runs the advance transition
async fn run_driver(
    session: Weak<PlaybackSession>,
    mut rx: mpsc::UnboundedReceiver<DriverMsg>,
    cancel: CancellationToken,
) {
    loop {
        let msg = tokio::select! {
            _ = cancel.cancelled() => break,
            msg = rx.recv() => match msg {
                Some(msg) => msg,
                None => break,
            },
        };

        let Some(session) = session.upgrade() else {
            break;
        };
        session.handle(msg).await;
    }
    debug!("Session driver exited");
}
