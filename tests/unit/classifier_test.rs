//! Unit tests for the rep/set classifier.

use chrono::Utc;
use strainsense::workouts::types::{
    StrainPoint, TimerAction, TimerId, TimerKind, WorkoutEvent,
};
use strainsense::workouts::{ClassifierOutput, WorkoutClassifier};

fn started() -> WorkoutClassifier {
    let mut classifier = WorkoutClassifier::with_defaults();
    classifier.resume();
    classifier
}

fn debounce_timer(out: &ClassifierOutput) -> TimerId {
    out.timers
        .iter()
        .find_map(|t| match t {
            TimerAction::Arm {
                kind: TimerKind::RepDebounce,
                id,
                ..
            } => Some(*id),
            _ => None,
        })
        .expect("debounce timer armed")
}

fn recovery_timer(out: &ClassifierOutput) -> TimerId {
    out.timers
        .iter()
        .find_map(|t| match t {
            TimerAction::Arm {
                kind: TimerKind::RecoveryTick,
                id,
                ..
            } => Some(*id),
            _ => None,
        })
        .expect("recovery ticker armed")
}

#[test]
fn test_single_frame_end_to_end() {
    let mut classifier = started();
    classifier.process_samples(&[630, 620, 650]);

    let state = classifier.state();
    assert_eq!(state.rep_count, 1);
    assert_eq!(state.max_strain, 650);
    assert_eq!(state.sensor_value, 650);
    assert_eq!(state.elapsed_ms, 150);
    // Decimation is checked before the clock advances
    assert_eq!(
        state.points,
        vec![
            StrainPoint {
                elapsed_ms: 0,
                strain: 630
            },
            StrainPoint {
                elapsed_ms: 100,
                strain: 650
            },
        ]
    );
}

#[test]
fn test_zero_samples_are_inert() {
    let mut classifier = started();
    let before = classifier.state().clone();

    let out = classifier.process_samples(&[0, 0, 0, 0]);

    assert!(out.is_empty());
    assert_eq!(classifier.state(), &before);
}

#[test]
fn test_below_threshold_never_counts() {
    let mut classifier = started();
    let samples: Vec<u16> = (1..=624).collect();
    classifier.process_samples(&samples);

    assert_eq!(classifier.state().rep_count, 0);
    assert_eq!(classifier.state().total_reps, 0);
    assert_eq!(classifier.state().max_strain, 624);
}

#[test]
fn test_threshold_is_inclusive() {
    let mut classifier = started();
    classifier.process_sample(625);
    assert_eq!(classifier.state().rep_count, 1);
}

#[test]
fn test_chart_floor_applies_to_points_only() {
    let mut classifier = started();
    classifier.process_sample(120);

    assert_eq!(classifier.state().sensor_value, 120);
    assert_eq!(classifier.state().points[0].strain, 400);
}

#[test]
fn test_reps_inside_debounce_window_are_suppressed() {
    let mut classifier = started();
    classifier.process_sample(700);
    classifier.process_samples(&[800, 900, 1000]);

    assert_eq!(classifier.state().rep_count, 1);
    assert_eq!(classifier.state().max_strain, 1000);
}

#[test]
fn test_rep_counts_again_after_debounce_expiry() {
    let mut classifier = started();
    let out = classifier.process_sample(650);
    let timer = debounce_timer(&out);

    classifier.on_timer(TimerKind::RepDebounce, timer);
    let out = classifier.process_sample(675);

    assert_eq!(classifier.state().rep_count, 2);
    assert_eq!(classifier.state().strain_per_rep, 662);
    assert!(out.events.contains(&WorkoutEvent::RepCompleted {
        rep_count: 2,
        total_reps: 2,
        strain: 675,
    }));
}

#[test]
fn test_superseded_debounce_expiry_is_ignored() {
    let mut classifier = started();
    let first = debounce_timer(&classifier.process_sample(650));
    classifier.pause();
    classifier.resume();
    let second = debounce_timer(&classifier.process_sample(650));
    assert_ne!(first, second);

    classifier.on_timer(TimerKind::RepDebounce, first);
    classifier.process_sample(700);
    assert_eq!(classifier.state().rep_count, 1);

    classifier.on_timer(TimerKind::RepDebounce, second);
    classifier.process_sample(700);
    assert_eq!(classifier.state().rep_count, 2);
}

#[test]
fn test_resume_starts_new_set() {
    let mut classifier = started();
    let timer = debounce_timer(&classifier.process_sample(900));
    classifier.on_timer(TimerKind::RepDebounce, timer);
    classifier.process_samples(&[300, 700]);
    assert_eq!(classifier.state().rep_count, 2);

    classifier.pause();
    let out = classifier.resume();

    let state = classifier.state();
    assert!(out
        .events
        .contains(&WorkoutEvent::SetStarted { set_number: 2 }));
    assert_eq!(state.set_count, 2);
    assert_eq!(state.rep_count, 0);
    assert_eq!(state.elapsed_ms, 0);
    assert!(state.points.is_empty());
    assert_eq!(state.strain_per_rep, 0);
    assert_eq!(state.max_strain, 900);
    assert_eq!(state.total_reps, 2);
    assert_eq!(state.strain_per_set, 800);
}

#[test]
fn test_paused_samples_only_update_value_and_max() {
    let mut classifier = started();
    classifier.process_sample(500);
    classifier.pause();

    classifier.process_samples(&[950, 960]);

    let state = classifier.state();
    assert_eq!(state.sensor_value, 960);
    assert_eq!(state.max_strain, 960);
    assert_eq!(state.rep_count, 0);
    assert_eq!(state.elapsed_ms, 50);
    assert_eq!(state.points.len(), 1);
}

#[test]
fn test_session_record_after_two_sets() {
    let mut classifier = started();

    // Set 1: two reps
    let timer = debounce_timer(&classifier.process_sample(650));
    classifier.on_timer(TimerKind::RepDebounce, timer);
    classifier.process_sample(700);

    // 4 seconds of recovery
    let ticker = recovery_timer(&classifier.pause());
    for _ in 0..4 {
        classifier.on_timer(TimerKind::RecoveryTick, ticker);
    }
    assert_eq!(classifier.state().recovery_seconds, 4);

    // Set 2: one rep
    classifier.resume();
    classifier.process_samples(&[300, 760]);

    let (session, out) = classifier.end_session(Utc::now());

    assert_eq!(session.sets, 2);
    assert_eq!(session.reps, 1);
    assert_eq!(session.recovery_seconds, 2);
    assert_eq!(session.strain_per_set, 703);
    assert_eq!(session.strain_per_rep, 760);
    assert_eq!(session.max_strain, 760);
    assert_eq!(session.points.len(), 1);

    assert!(out.timers.contains(&TimerAction::Cancel {
        kind: TimerKind::RecoveryTick
    }));
    assert!(out.timers.contains(&TimerAction::Cancel {
        kind: TimerKind::RepDebounce
    }));

    // Everything reset for the next session
    let state = classifier.state();
    assert!(!state.armed);
    assert!(state.is_paused);
    assert_eq!(state.set_count, 0);
    assert_eq!(state.max_strain, 0);
}

#[test]
fn test_ticks_after_resume_are_ignored() {
    let mut classifier = started();
    let ticker = recovery_timer(&classifier.pause());
    classifier.resume();

    let out = classifier.on_timer(TimerKind::RecoveryTick, ticker);
    assert!(out.is_empty());
    assert_eq!(classifier.state().recovery_seconds, 0);
    assert_eq!(classifier.state().total_recovery_seconds, 0);
}
