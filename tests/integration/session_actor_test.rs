//! Integration tests for the workout session actor with real timers.

use std::time::Duration;
use strainsense::workouts::types::{ClassifierConfig, WorkoutEvent};
use strainsense::SessionActor;

fn fast_config() -> ClassifierConfig {
    ClassifierConfig {
        rep_debounce: Duration::from_millis(100),
        recovery_tick: Duration::from_millis(40),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_debounce_window_suppresses_then_rearms() {
    let (handle, _task) = SessionActor::spawn(fast_config());
    handle.resume().unwrap();

    handle.submit_samples(vec![700]).unwrap();
    handle.submit_samples(vec![710]).unwrap();
    assert_eq!(handle.snapshot().await.unwrap().rep_count, 1);

    tokio::time::sleep(Duration::from_millis(250)).await;
    handle.submit_samples(vec![720]).unwrap();
    assert_eq!(handle.snapshot().await.unwrap().rep_count, 2);
}

#[tokio::test]
async fn test_recovery_seconds_tick_while_paused() {
    let (handle, _task) = SessionActor::spawn(fast_config());
    handle.resume().unwrap();
    handle.pause().unwrap();

    tokio::time::sleep(Duration::from_millis(230)).await;
    let ticks = handle.snapshot().await.unwrap().recovery_seconds;
    assert!(ticks >= 2, "expected at least 2 ticks, got {}", ticks);

    handle.resume().unwrap();
    let state = handle.snapshot().await.unwrap();
    assert_eq!(state.recovery_seconds, 0);
    let banked = state.total_recovery_seconds;
    assert!(banked >= ticks);

    // Ticker is stopped once the set resumes
    tokio::time::sleep(Duration::from_millis(150)).await;
    let state = handle.snapshot().await.unwrap();
    assert_eq!(state.recovery_seconds, 0);
    assert_eq!(state.total_recovery_seconds, banked);
}

#[tokio::test]
async fn test_pause_cancels_pending_debounce() {
    let (handle, _task) = SessionActor::spawn(fast_config());
    handle.resume().unwrap();
    handle.submit_samples(vec![800]).unwrap();
    handle.pause().unwrap();
    handle.resume().unwrap();

    // No wait needed: the new set starts with rep detection armed
    handle.submit_samples(vec![800]).unwrap();
    let state = handle.snapshot().await.unwrap();
    assert_eq!(state.rep_count, 1);
    assert_eq!(state.total_reps, 2);
}

#[tokio::test]
async fn test_end_session_publishes_record_and_resets() {
    let (handle, _task) = SessionActor::spawn(fast_config());
    let events = handle.subscribe().unwrap();

    handle.toggle_pause().unwrap();
    handle.submit_samples(vec![650, 500]).unwrap();
    let session = handle.end_session().await.unwrap();

    assert_eq!(session.sets, 1);
    assert_eq!(session.reps, 1);
    assert_eq!(session.max_strain, 650);

    let published: Vec<_> = events
        .try_iter()
        .filter_map(|e| match e {
            WorkoutEvent::SessionEnded(s) => Some(s),
            _ => None,
        })
        .collect();
    assert_eq!(published, vec![session]);

    let state = handle.snapshot().await.unwrap();
    assert!(!state.armed);
    assert_eq!(state.set_count, 0);

    // Samples are ignored until the next session starts
    handle.submit_samples(vec![900]).unwrap();
    assert_eq!(handle.snapshot().await.unwrap().max_strain, 0);
}

#[tokio::test]
async fn test_dropped_subscriber_is_pruned() {
    let (handle, _task) = SessionActor::spawn(fast_config());
    let dropped = handle.subscribe().unwrap();
    let kept = handle.subscribe().unwrap();
    drop(dropped);

    handle.resume().unwrap();
    handle.submit_samples(vec![630]).unwrap();
    handle.snapshot().await.unwrap();

    assert!(kept.try_iter().any(|e| matches!(e, WorkoutEvent::RepCompleted { .. })));
}

#[tokio::test]
async fn test_actor_stops_when_handles_dropped() {
    let (handle, task) = SessionActor::spawn(fast_config());
    handle.resume().unwrap();
    handle.pause().unwrap();
    drop(handle);

    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("actor did not stop")
        .unwrap();
}
