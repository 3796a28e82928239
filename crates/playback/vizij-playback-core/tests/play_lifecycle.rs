use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use vizij_playback_core::{OwnerQueue, PlaybackCoordinator, PlayerConfig, PlayerEvent};
use vizij_playback_test_fixtures::{
    ControllerCall, FakeEngine, FakeSource, FakeStore, Rig, SourceBehavior,
};

fn no_autoplay() -> PlayerConfig {
    PlayerConfig {
        auto_play: false,
        ..PlayerConfig::default()
    }
}

fn position(events: &[PlayerEvent], wanted: &PlayerEvent) -> usize {
    events
        .iter()
        .position(|e| e == wanted)
        .unwrap_or_else(|| panic!("missing {wanted:?} in {events:?}"))
}

/// it should complete the previous play before the next one starts
#[test]
fn supersede_completes_old_before_starting_new() {
    let rig = Rig::new();
    rig.load(1000);

    let mut first = rig.player.play(0.0, 1.0, false);
    let first_id = rig.player.active_play().expect("first play active").id;

    let _second = rig.player.play(0.5, 1.0, false);
    let second_id = rig.player.active_play().expect("second play active").id;
    assert_ne!(first_id, second_id);

    let events = rig.log.lifecycle();
    let completed = position(&events, &PlayerEvent::PlayCompleted { play: first_id });
    let started = position(&events, &PlayerEvent::PlayStarted { play: second_id });
    assert!(completed < started, "events out of order: {events:?}");

    assert!(first.is_resolved());
    assert!(rig.player.is_playing());
    assert_eq!(rig.engine.started(), 2);
    assert!(rig.engine.is_released(0));
    // The stopped play's start was written back to the store.
    assert_eq!(rig.store.writes(), vec![0.0]);
}

/// it should report not playing right after stop and resolve the stopped play
#[test]
fn stop_clears_playing_and_resolves() {
    let rig = Rig::new();
    rig.load(1000);

    let completion = rig.player.play(0.3, 0.8, false);
    assert!(rig.player.is_playing());

    rig.player.stop();
    assert!(!rig.player.is_playing());
    assert!(rig.player.active_play().is_none());
    assert!(completion.now_or_never().is_some());
    assert_eq!(rig.store.writes(), vec![0.3]);
}

/// it should resolve a finite play when the engine signals completion
#[test]
fn engine_completion_resolves_play() {
    let rig = Rig::new();
    rig.load(1000);

    let completion = rig.player.play(0.0, 1.0, false);
    let id = rig.player.active_play().expect("active play").id;
    assert!(rig.engine.subscribed(0));
    assert!(rig.engine.complete(0));

    assert!(!rig.player.is_playing());
    assert!(rig.engine.is_released(0));
    assert!(completion.now_or_never().is_some());
    assert!(rig.store.writes().is_empty());
    assert_eq!(
        rig.log.lifecycle().last(),
        Some(&PlayerEvent::PlayCompleted { play: id })
    );
}

/// it should resolve looped plays through set_progress and leave the store at the clamped value
#[test]
fn set_progress_completes_looped_play() {
    let rig = Rig::new();
    rig.load(1000);

    let completion = rig.player.play(0.0, 1.0, true);
    assert!(!rig.engine.subscribed(0), "looped plays never complete on their own");

    rig.player.set_progress(0.4);
    assert_eq!(rig.store.writes(), vec![0.4]);
    assert_eq!(rig.player.progress(), 0.4);
    assert!(!rig.player.is_playing());
    assert!(rig.engine.is_released(0));
    assert!(completion.now_or_never().is_some());

    rig.player.set_progress(1.7);
    rig.player.set_progress(f64::NAN);
    assert_eq!(rig.store.writes(), vec![0.4, 1.0, 0.0]);
}

/// it should unsubscribe a superseded play from engine completion
#[test]
fn superseded_play_ignores_engine_completion() {
    let rig = Rig::new();
    rig.load(1000);

    let _first = rig.player.play(0.0, 1.0, false);
    let _second = rig.player.play(0.0, 0.5, false);

    assert!(!rig.engine.complete(0));
    assert!(rig.player.is_playing());
    assert_eq!(rig.player.active_play().map(|p| p.to), Some(0.5));
}

/// it should jump straight to `from` without an engine animation below the floor
#[test]
fn short_play_completes_synchronously() {
    let rig = Rig::new();
    rig.load(10);

    let mut completion = rig.player.play(0.999, 1.0, false);
    assert!(completion.is_resolved());
    assert_eq!(rig.engine.started(), 0);
    assert_eq!(rig.store.writes(), vec![0.999]);
    assert!(!rig.player.is_playing());
    assert!(!rig
        .log
        .events()
        .iter()
        .any(|e| matches!(e, PlayerEvent::IsPlayingChanged { .. })));
}

/// it should seek to the end when starting with a negative rate
#[test]
fn negative_rate_starts_from_end() {
    let rig = Rig::new();
    rig.load(1000);
    rig.player.set_playback_rate(-1.0);

    let _play = rig.player.play(0.0, 1.0, false);
    assert_eq!(
        rig.engine.calls(0),
        vec![ControllerCall::SetRate(-1.0), ControllerCall::Seek(1.0)]
    );
}

/// it should forward rate changes to the running animation
#[test]
fn playback_rate_applies_live() {
    let rig = Rig::new();
    rig.load(1000);

    let _play = rig.player.play(0.0, 1.0, false);
    rig.player.set_playback_rate(2.0);

    assert_eq!(rig.player.playback_rate(), 2.0);
    assert_eq!(
        rig.engine.calls(0),
        vec![ControllerCall::SetRate(1.0), ControllerCall::SetRate(2.0)]
    );
}

/// it should ignore rates that are not finite
#[test]
fn non_finite_rate_is_ignored() {
    let rig = Rig::new();
    rig.load(1000);

    let _play = rig.player.play(0.0, 1.0, false);
    rig.player.set_playback_rate(f64::NAN);
    rig.player.set_playback_rate(f64::INFINITY);

    assert_eq!(rig.player.playback_rate(), 1.0);
    assert_eq!(rig.engine.calls(0), vec![ControllerCall::SetRate(1.0)]);
}

/// it should start a pending play once content loads, sizing it from the loaded duration
#[test]
fn pending_play_starts_on_load() {
    let rig = Rig::new();
    let source = FakeSource::with_behavior(2000, SourceBehavior::NoRoot);
    rig.player.set_source(Some(source.clone()));
    assert!(!rig.player.is_content_loaded());

    let completion = rig.player.play(0.0, 0.5, false);
    let pending = rig.player.active_play().expect("pending play");
    assert!(!pending.started);
    assert_eq!(pending.duration, None);
    assert!(!rig.player.is_playing());
    assert_eq!(rig.engine.started(), 0);

    source.set_behavior(SourceBehavior::Ok);
    rig.player.invalidate_content();
    assert_eq!(rig.engine.started(), 1);
    assert_eq!(rig.engine.animation(0).duration, Duration::from_secs(1));
    assert!(rig.player.is_playing());

    let events = rig.log.lifecycle();
    let loaded = position(&events, &PlayerEvent::ContentLoadedChanged { loaded: true });
    let started = position(&events, &PlayerEvent::PlayStarted { play: pending.id });
    assert!(loaded < started);

    rig.engine.complete(0);
    assert!(completion.now_or_never().is_some());
}

/// it should hold engine completion until the owner thread drains its queue
#[test]
fn off_thread_completion_is_marshalled() {
    let queue = Arc::new(OwnerQueue::new());
    let rig = Rig::with_dispatcher(no_autoplay(), queue.clone());
    rig.load(1000);

    let mut completion = rig.player.play(0.0, 1.0, false);
    rig.engine
        .complete_on_thread(0)
        .expect("finite play is subscribed")
        .join()
        .expect("compositor thread");

    assert!(rig.player.is_playing());
    assert!(!completion.is_resolved());
    assert_eq!(queue.len(), 1);

    assert_eq!(queue.run_pending(), 1);
    assert!(!rig.player.is_playing());
    assert!(completion.is_resolved());
}

/// it should drop a queued completion whose play was superseded before it ran
#[test]
fn queued_stale_completion_is_ignored() {
    let queue = Arc::new(OwnerQueue::new());
    let rig = Rig::with_dispatcher(no_autoplay(), queue.clone());
    rig.load(1000);

    let _first = rig.player.play(0.0, 1.0, false);
    rig.engine
        .complete_on_thread(0)
        .expect("finite play is subscribed")
        .join()
        .expect("compositor thread");

    let second = rig.player.play(0.2, 0.6, false);
    assert_eq!(queue.run_pending(), 1);

    assert!(rig.player.is_playing());
    assert_eq!(rig.player.active_play().map(|p| p.from), Some(0.2));
    assert!(second.now_or_never().is_none());
}

/// it should resolve a play completed on another thread with the inline dispatcher
#[test]
fn inline_dispatch_completes_from_any_thread() {
    let rig = Rig::new();
    rig.load(1000);

    let completion = rig.player.play(0.0, 1.0, false);
    rig.engine
        .complete_on_thread(0)
        .expect("finite play is subscribed")
        .join()
        .expect("compositor thread");

    futures::executor::block_on(completion);
    assert!(!rig.player.is_playing());
}

/// it should turn every operation into a no-op when playback is unsupported
#[test]
fn unsupported_environment_is_inert() {
    let rig = Rig::with_config(PlayerConfig {
        playback_supported: false,
        ..no_autoplay()
    });
    rig.load(1000);

    let mut completion = rig.player.play(0.0, 1.0, false);
    assert!(completion.is_resolved());
    rig.player.pause();
    rig.player.set_progress(0.5);
    rig.player.set_playback_rate(2.0);
    rig.player.stop();

    assert_eq!(rig.player.playback_rate(), 1.0);

    assert!(!rig.player.is_content_loaded());
    assert!(rig.player.active_play().is_none());
    assert_eq!(rig.engine.started(), 0);
    assert!(rig.store.writes().is_empty());
}

/// it should resolve the active play when the last player handle is dropped
#[test]
fn dropping_player_resolves_active_play() {
    let Rig { player, engine, .. } = Rig::new();
    player.set_source(Some(FakeSource::new(1000)));

    let completion = player.play(0.0, 1.0, true);
    drop(player);

    futures::executor::block_on(completion);
    assert!(engine.is_released(0));
}

/// it should refuse to build a player from a config with a non-finite rate
#[test]
fn invalid_config_is_rejected() {
    let config = PlayerConfig {
        playback_rate: f64::NAN,
        ..no_autoplay()
    };
    let err = PlaybackCoordinator::new(config, FakeEngine::new(), FakeStore::new())
        .expect_err("NaN rate must not validate");
    assert_eq!(err.category(), "config");
}
