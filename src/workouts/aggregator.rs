//! Folds the live workout state into a finalized session record.

use crate::workouts::types::{WorkoutSession, WorkoutState};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Truncating integer average; zero when there is nothing to divide by.
pub fn average(sum: u64, count: u32) -> u32 {
    sum.checked_div(u64::from(count))
        .map_or(0, |avg| u32::try_from(avg).unwrap_or(u32::MAX))
}

/// Build the session record for a state snapshot.
///
/// `reps` and `recovery_seconds` are per-set averages of the session totals,
/// and `strain_per_set` is the session-wide strain per rep. The recovery
/// interval still in progress is included.
pub fn finalize_session(state: &WorkoutState, date: DateTime<Utc>) -> WorkoutSession {
    let sets = state.set_count;
    let total_recovery =
        u64::from(state.total_recovery_seconds) + u64::from(state.recovery_seconds);

    WorkoutSession {
        id: Uuid::new_v4(),
        date,
        sets,
        reps: average(u64::from(state.total_reps), sets),
        recovery_seconds: average(total_recovery, sets),
        strain_per_set: average(state.total_rep_strain_sum, state.total_reps),
        strain_per_rep: state.strain_per_rep,
        max_strain: state.max_strain,
        points: state.points.clone(),
    }
}
