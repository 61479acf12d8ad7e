//! Unit tests for session finalization.

use chrono::Utc;
use strainsense::workouts::aggregator::{average, finalize_session};
use strainsense::workouts::types::WorkoutState;
use strainsense::workouts::WorkoutClassifier;

#[test]
fn test_strain_per_rep_truncates() {
    // Two reps of 650 and 675
    assert_eq!(average(650 + 675, 2), 662);
}

#[test]
fn test_end_with_no_sets_yields_zeros() {
    let mut classifier = WorkoutClassifier::with_defaults();
    let (session, _) = classifier.end_session(Utc::now());

    assert_eq!(session.sets, 0);
    assert_eq!(session.reps, 0);
    assert_eq!(session.recovery_seconds, 0);
    assert_eq!(session.strain_per_set, 0);
    assert_eq!(session.strain_per_rep, 0);
    assert_eq!(session.max_strain, 0);
}

#[test]
fn test_finalize_divides_totals_by_sets() {
    let mut state = WorkoutState::new();
    state.set_count = 2;
    state.total_reps = 7;
    state.total_rep_strain_sum = 4 * 650 + 3 * 700;
    state.total_recovery_seconds = 61;

    let session = finalize_session(&state, Utc::now());
    assert_eq!(session.reps, 3);
    assert_eq!(session.recovery_seconds, 30);
    assert_eq!(session.strain_per_set, 671);
}

#[test]
fn test_each_session_gets_a_fresh_id() {
    let state = WorkoutState::new();
    let a = finalize_session(&state, Utc::now());
    let b = finalize_session(&state, Utc::now());
    assert_ne!(a.id, b.id);
}
