//! Shared fakes for session and registry tests
#![allow(dead_code)]

use async_trait::async_trait;
use goon_common::events::{PlaybackState, PlayerEvent};
use goon_player::error::{ResolveError, TransportError};
use goon_player::playback::{
    CompletionHandle, PlayRequest, SessionDeps, SessionSettings, Transport,
};
use goon_player::publisher::ViewPublisher;
use goon_player::resolver::{MediaItem, MediaResolver, ResolvedMedia, RetryPolicy, RetryingResolver};
use goon_player::SessionRegistry;
use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn item(query: &str) -> MediaItem {
    MediaItem {
        title: title_of(query),
        stream_locator: format!("https://cdn.example/{}", query),
        duration_secs: 200,
        thumbnail_url: None,
    }
}

pub fn title_of(query: &str) -> String {
    format!("Title {}", query)
}

// ========================================
// Resolver
// ========================================

type Answer = Result<Option<ResolvedMedia>, ResolveError>;

/// Resolver answering from per-query scripts, then `item(query)` by default
#[derive(Default)]
pub struct ScriptedResolver {
    scripts: Mutex<HashMap<String, VecDeque<Answer>>>,
    delays: Mutex<HashMap<String, Duration>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedResolver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue answers for successive attempts on `query`
    pub fn script(&self, query: &str, answers: Vec<Answer>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(query.to_string())
            .or_default()
            .extend(answers);
    }

    /// Fail every attempt on `query`
    pub fn always_fail(&self, query: &str, attempts: usize) {
        let answers = (0..attempts)
            .map(|n| Err(ResolveError::Failed(format!("attempt {} failed", n + 1))))
            .collect();
        self.script(query, answers);
    }

    /// Each attempt on `query` takes `delay` before answering
    pub fn slow(&self, query: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(query.to_string(), delay);
    }

    pub fn calls_for(&self, query: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|q| *q == query).count()
    }
}

#[async_trait]
impl MediaResolver for ScriptedResolver {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn resolve(&self, query: &str) -> Answer {
        self.calls.lock().unwrap().push(query.to_string());

        let delay = self.delays.lock().unwrap().get(query).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(query)
            .and_then(VecDeque::pop_front);
        scripted.unwrap_or_else(|| Ok(Some(ResolvedMedia::Item(item(query)))))
    }
}

// ========================================
// Transport
// ========================================

/// Transport that plays forever until stopped or finished by the test
#[derive(Default)]
pub struct FakeTransport {
    plays: Mutex<Vec<(String, String)>>,
    handles: Mutex<HashMap<String, CompletionHandle>>,
    failing_titles: Mutex<HashSet<String>>,
    paused: Mutex<HashSet<String>>,
    pauses: Mutex<usize>,
    resumes: Mutex<usize>,
    stops: Mutex<usize>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Titles started for `session_id`, in order
    pub fn played(&self, session_id: &str) -> Vec<String> {
        self.plays
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| s == session_id)
            .map(|(_, title)| title.clone())
            .collect()
    }

    /// Make `play` fail for this title
    pub fn fail_title(&self, title: &str) {
        self.failing_titles.lock().unwrap().insert(title.to_string());
    }

    /// End the running item normally
    pub fn finish(&self, session_id: &str) -> bool {
        match self.take_handle(session_id) {
            Some(handle) => {
                handle.finish(None);
                true
            }
            None => false,
        }
    }

    /// Remove the running item's handle without firing it
    pub fn take_handle(&self, session_id: &str) -> Option<CompletionHandle> {
        self.handles.lock().unwrap().remove(session_id)
    }

    /// Whether the last pause/resume left `session_id` paused
    pub fn is_paused(&self, session_id: &str) -> bool {
        self.paused.lock().unwrap().contains(session_id)
    }

    pub fn pauses(&self) -> usize {
        *self.pauses.lock().unwrap()
    }

    pub fn resumes(&self) -> usize {
        *self.resumes.lock().unwrap()
    }

    pub fn stops(&self) -> usize {
        *self.stops.lock().unwrap()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn play(
        &self,
        session_id: &str,
        request: PlayRequest,
        done: CompletionHandle,
    ) -> Result<(), TransportError> {
        let title = request.item.title;
        if self.failing_titles.lock().unwrap().contains(&title) {
            return Err(TransportError::Failed(format!("cannot stream {}", title)));
        }
        self.plays
            .lock()
            .unwrap()
            .push((session_id.to_string(), title));
        self.handles
            .lock()
            .unwrap()
            .insert(session_id.to_string(), done);
        Ok(())
    }

    // yield first so overlapping calls can interleave
    async fn pause(&self, session_id: &str) {
        tokio::task::yield_now().await;
        *self.pauses.lock().unwrap() += 1;
        self.paused.lock().unwrap().insert(session_id.to_string());
    }

    async fn resume(&self, session_id: &str) {
        tokio::task::yield_now().await;
        *self.resumes.lock().unwrap() += 1;
        self.paused.lock().unwrap().remove(session_id);
    }

    async fn stop(&self, session_id: &str) {
        *self.stops.lock().unwrap() += 1;
        self.paused.lock().unwrap().remove(session_id);
        self.finish(session_id);
    }
}

// ========================================
// Publisher
// ========================================

#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<PlayerEvent>>,
}

impl RecordingPublisher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<PlayerEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, session_id: &str, event_type: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.session_id() == session_id && e.event_type() == event_type)
            .count()
    }

    /// Queries reported as dropped
    pub fn failed_queries(&self, session_id: &str) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                PlayerEvent::ItemFailed {
                    session_id: s,
                    query,
                    ..
                } if s == session_id => Some(query.clone()),
                _ => None,
            })
            .collect()
    }

    /// (old, new) pairs of state changes
    pub fn transitions(&self, session_id: &str) -> Vec<(PlaybackState, PlaybackState)> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                PlayerEvent::StateChanged {
                    session_id: s,
                    old_state,
                    new_state,
                    ..
                } if s == session_id => Some((*old_state, *new_state)),
                _ => None,
            })
            .collect()
    }
}

impl ViewPublisher for RecordingPublisher {
    fn publish(&self, event: PlayerEvent) {
        self.events.lock().unwrap().push(event);
    }
}

// ========================================
// Harness
// ========================================

pub struct Harness {
    pub registry: Arc<SessionRegistry>,
    pub resolver: Arc<ScriptedResolver>,
    pub transport: Arc<FakeTransport>,
    pub publisher: Arc<RecordingPublisher>,
}

pub fn harness() -> Harness {
    harness_with(SessionSettings::default(), RetryPolicy::default())
}

pub fn harness_with(settings: SessionSettings, policy: RetryPolicy) -> Harness {
    let resolver = ScriptedResolver::new();
    let transport = FakeTransport::new();
    let publisher = RecordingPublisher::new();

    let registry = Arc::new(SessionRegistry::new(SessionDeps {
        resolver: Arc::new(RetryingResolver::new(resolver.clone(), policy)),
        transport: transport.clone(),
        publisher: publisher.clone(),
        settings,
    }));

    Harness {
        registry,
        resolver,
        transport,
        publisher,
    }
}

impl Harness {
    /// Wait until `session_id` is playing `title`
    pub async fn playing(&self, session_id: &str, title: &str) -> bool {
        eventually(move || async move {
            let view = self.registry.current_view(session_id).await;
            view.state == PlaybackState::Playing && view.title.as_deref() == Some(title)
        })
        .await
    }

    /// Wait until `session_id` is idle with nothing in flight
    pub async fn settled_idle(&self, session_id: &str) -> bool {
        eventually(move || async move {
            let view = self.registry.current_view(session_id).await;
            view.state == PlaybackState::Idle && view.pending.is_none()
        })
        .await
    }
}

/// Poll `check` every 10ms for up to 5s
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..500 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
