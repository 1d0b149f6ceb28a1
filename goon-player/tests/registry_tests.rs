//! Session registry and progress sweep

mod helpers;

use goon_common::events::{PlaybackState, PlayerEvent};
use goon_player::monitor::{start_progress_sweep, sweep_once};
use goon_player::playback::{ControlOutcome, NoOpReason, ShuffleOutcome};
use goon_player::publisher::ViewPublisher;
use helpers::{harness, title_of};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_get_or_create_is_idempotent() {
    let h = harness();
    let first = h.registry.get_or_create("guild-1").await;
    let second = h.registry.get_or_create("guild-1").await;

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(h.registry.len().await, 1);
    assert_eq!(h.publisher.count("guild-1", "SessionOpened"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_get_or_create_yields_one_session() {
    let h = harness();
    let registry = h.registry.clone();

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let registry = registry.clone();
            tokio::spawn(async move { registry.get_or_create("guild-1").await })
        })
        .collect();

    let mut sessions = Vec::new();
    for task in tasks {
        sessions.push(task.await.unwrap());
    }

    assert!(sessions.iter().all(|s| Arc::ptr_eq(s, &sessions[0])));
    assert_eq!(registry.len().await, 1);
    assert_eq!(h.publisher.count("guild-1", "SessionOpened"), 1);
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let h = harness();
    h.registry.enqueue("guild-1", "A").await;
    h.registry.enqueue("guild-2", "B").await;

    assert!(h.playing("guild-1", &title_of("A")).await);
    assert!(h.playing("guild-2", &title_of("B")).await);

    h.registry.pause("guild-1").await;
    assert_eq!(h.registry.state("guild-1").await, PlaybackState::Paused);
    assert_eq!(h.registry.state("guild-2").await, PlaybackState::Playing);
}

#[tokio::test]
async fn test_remove_shuts_down_and_forgets() {
    let h = harness();
    h.registry.enqueue("guild-1", "A").await;
    assert!(h.playing("guild-1", &title_of("A")).await);
    let old = h.registry.get("guild-1").await.unwrap();

    assert!(h.registry.remove("guild-1").await);
    assert!(!h.registry.remove("guild-1").await);

    assert!(old.is_closed().await);
    assert_eq!(old.state().await, PlaybackState::Idle);
    assert!(h.registry.get("guild-1").await.is_none());
    assert_eq!(h.transport.stops(), 1);
    assert_eq!(h.publisher.count("guild-1", "SessionClosed"), 1);

    // a later request builds a fresh session
    let fresh = h.registry.get_or_create("guild-1").await;
    assert_ne!(fresh.instance_id(), old.instance_id());
    assert!(!fresh.is_closed().await);
}

#[tokio::test]
async fn test_transport_disconnect_removes_session() {
    let h = harness();
    h.registry.get_or_create("guild-1").await;

    assert!(h.registry.on_transport_disconnected("guild-1").await);
    assert!(h.registry.is_empty().await);
}

#[tokio::test]
async fn test_absent_session_operations_do_not_create() {
    let h = harness();

    assert_eq!(
        h.registry.pause("nobody").await,
        ControlOutcome::NoOp(NoOpReason::NoSession)
    );
    assert_eq!(
        h.registry.skip("nobody").await,
        ControlOutcome::NoOp(NoOpReason::NoSession)
    );
    assert_eq!(h.registry.shuffle("nobody").await, ShuffleOutcome::Insufficient);
    assert_eq!(h.registry.queue_snapshot("nobody", 5).await.total, 0);

    let view = h.registry.current_view("nobody").await;
    assert_eq!(view.state, PlaybackState::Idle);
    assert!(view.title.is_none());

    h.registry.on_finished("nobody", None).await;
    assert!(h.registry.is_empty().await);
}

#[tokio::test]
async fn test_list_active_and_shutdown_all() {
    let h = harness();
    for id in ["guild-3", "guild-1", "guild-2"] {
        h.registry.get_or_create(id).await;
    }
    h.registry.enqueue("guild-2", "A").await;
    assert!(h.playing("guild-2", &title_of("A")).await);

    assert_eq!(
        h.registry.list_active().await,
        vec!["guild-1", "guild-2", "guild-3"]
    );

    h.registry.shutdown_all().await;
    assert!(h.registry.list_active().await.is_empty());
    assert_eq!(h.transport.stops(), 1);
    for id in ["guild-1", "guild-2", "guild-3"] {
        assert_eq!(h.publisher.count(id, "SessionClosed"), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn test_sweep_publishes_only_playing_sessions() {
    let h = harness();
    h.registry.enqueue("playing", "A").await;
    h.registry.enqueue("paused", "B").await;
    h.registry.get_or_create("idle").await;
    assert!(h.playing("playing", &title_of("A")).await);
    assert!(h.playing("paused", &title_of("B")).await);
    h.registry.pause("paused").await;

    let publisher: &dyn ViewPublisher = h.publisher.as_ref();
    assert_eq!(sweep_once(&h.registry, publisher).await, 1);

    assert_eq!(h.publisher.count("playing", "Progress"), 1);
    assert_eq!(h.publisher.count("paused", "Progress"), 0);
    assert_eq!(h.publisher.count("idle", "Progress"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_sweep_does_not_mutate_playback() {
    let h = harness();
    h.registry.enqueue("guild-1", "A").await;
    assert!(h.playing("guild-1", &title_of("A")).await);
    let before = h.publisher.events().len();

    let publisher: &dyn ViewPublisher = h.publisher.as_ref();
    for _ in 0..3 {
        sweep_once(&h.registry, publisher).await;
    }

    let after: Vec<PlayerEvent> = h.publisher.events().into_iter().skip(before).collect();
    assert_eq!(after.len(), 3);
    assert!(after.iter().all(|e| e.event_type() == "Progress"));
    assert_eq!(h.registry.state("guild-1").await, PlaybackState::Playing);
    assert_eq!(h.transport.played("guild-1").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_sweep_tolerates_sessions_removed_between_ticks() {
    let h = harness();
    h.registry.enqueue("a", "A").await;
    h.registry.enqueue("b", "B").await;
    assert!(h.playing("a", &title_of("A")).await);
    assert!(h.playing("b", &title_of("B")).await);

    let cancel = CancellationToken::new();
    let sweep = start_progress_sweep(
        h.registry.clone(),
        h.publisher.clone(),
        Duration::from_secs(2),
        cancel.clone(),
    );

    tokio::time::sleep(Duration::from_millis(4500)).await;
    assert!(h.registry.remove("a").await);
    let a_ticks = h.publisher.count("a", "Progress");
    let b_ticks = h.publisher.count("b", "Progress");
    assert!(a_ticks >= 2);

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(h.publisher.count("a", "Progress"), a_ticks);
    assert!(h.publisher.count("b", "Progress") > b_ticks);

    cancel.cancel();
    sweep.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_progress_view_tracks_elapsed_time() {
    let h = harness();
    h.registry.enqueue("guild-1", "A").await;
    assert!(h.playing("guild-1", &title_of("A")).await);

    tokio::time::sleep(Duration::from_secs(50)).await;
    let publisher: &dyn ViewPublisher = h.publisher.as_ref();
    sweep_once(&h.registry, publisher).await;

    let view = h
        .publisher
        .events()
        .into_iter()
        .find_map(|e| match e {
            PlayerEvent::Progress { view, .. } => Some(view),
            _ => None,
        })
        .unwrap();
    // 200s item, ~50s in
    let progress = view.progress.unwrap();
    assert!((0.24..0.26).contains(&progress), "progress = {progress}");
    assert_eq!(view.duration.secs(), Some(200));
}
