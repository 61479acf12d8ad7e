//! Workout types: live state, events, timers, configuration and session records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// A charted strain value at a point of the set's synthetic clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrainPoint {
    /// Milliseconds since the set started (sample-driven, not wall clock)
    pub elapsed_ms: u64,
    /// Strain value, floored for charting
    pub strain: u16,
}

/// Identity of one armed timer instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// The two timer sources feeding the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// One-shot window suppressing rep detection after a rep
    RepDebounce,
    /// Periodic tick counting recovery seconds while paused
    RecoveryTick,
}

impl std::fmt::Display for TimerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimerKind::RepDebounce => write!(f, "rep debounce"),
            TimerKind::RecoveryTick => write!(f, "recovery ticker"),
        }
    }
}

/// A timer change requested by the classifier.
///
/// Arming a kind replaces any live timer of the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    /// Start a timer; one-shot for `RepDebounce`, repeating for `RecoveryTick`
    Arm {
        kind: TimerKind,
        id: TimerId,
        period: Duration,
    },
    /// Stop the live timer of this kind
    Cancel { kind: TimerKind },
}

/// Rep detector state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepDetector {
    /// Next sample at or above threshold counts as a rep
    #[default]
    Armed,
    /// A rep was just counted; waiting for the debounce timer
    Debouncing { timer: TimerId },
}

/// The live workout aggregate, owned by the classifier.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkoutState {
    /// A session is in progress (first set started, not yet ended)
    pub armed: bool,
    /// Between sets (recovery)
    pub is_paused: bool,
    /// Rep debounce state
    pub rep_detector: RepDetector,
    /// Synthetic set clock in milliseconds
    pub elapsed_ms: u64,
    /// Reps in the current set
    pub rep_count: u32,
    /// Sets started this session
    pub set_count: u32,
    /// Sum of rep strains in the current set
    pub current_rep_strain_sum: u64,
    /// Reps this session
    pub total_reps: u32,
    /// Sum of rep strains this session
    pub total_rep_strain_sum: u64,
    /// Recovery seconds of the interval in progress
    pub recovery_seconds: u32,
    /// Recovery seconds of completed intervals
    pub total_recovery_seconds: u32,
    /// Largest sample this session
    pub max_strain: u16,
    /// Most recent non-zero sample
    pub sensor_value: u16,
    /// Current set average strain per rep
    pub strain_per_rep: u32,
    /// Session average strain per rep (historically named per set)
    pub strain_per_set: u32,
    /// Current set's charted trace
    pub points: Vec<StrainPoint>,
}

impl WorkoutState {
    /// Fresh state: not armed, paused, all counters zero.
    pub fn new() -> Self {
        Self {
            is_paused: true,
            ..Default::default()
        }
    }

    /// Snapshot of the values shown to the user.
    pub fn metrics(&self) -> WorkoutMetrics {
        WorkoutMetrics {
            sets: self.set_count,
            reps: self.rep_count,
            recovery_seconds: self.recovery_seconds,
            strain_per_set: self.strain_per_set,
            strain_per_rep: self.strain_per_rep,
            max_strain: self.max_strain,
            sensor_value: self.sensor_value,
            is_paused: self.is_paused,
            elapsed_ms: self.elapsed_ms,
        }
    }
}

/// Display-facing metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkoutMetrics {
    pub sets: u32,
    pub reps: u32,
    pub recovery_seconds: u32,
    pub strain_per_set: u32,
    pub strain_per_rep: u32,
    pub max_strain: u16,
    pub sensor_value: u16,
    pub is_paused: bool,
    pub elapsed_ms: u64,
}

/// Typed change notifications from the classifier.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkoutEvent {
    /// A non-zero sample was accepted
    SensorValue(u16),
    /// Session maximum increased
    NewMaxStrain(u16),
    /// A point was appended to the current set's trace
    PointAppended(StrainPoint),
    /// A rep was counted
    RepCompleted {
        rep_count: u32,
        total_reps: u32,
        strain: u16,
    },
    /// A new set started; the trace was cleared
    SetStarted { set_number: u32 },
    /// Recovery started
    Paused,
    /// Derived metrics changed
    MetricsUpdated(WorkoutMetrics),
    /// Session finalized; all state reset
    SessionEnded(WorkoutSession),
}

/// Classifier thresholds and timing.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Minimum sample counted as a rep
    pub rep_threshold: u16,
    /// Charted values below this are raised to it
    pub chart_floor: u16,
    /// Synthetic clock advance per processed sample
    pub sample_interval_ms: u64,
    /// A point is charted when the set clock is a multiple of this
    pub decimation_ms: u64,
    /// Minimum spacing between counted reps
    pub rep_debounce: Duration,
    /// Recovery ticker period
    pub recovery_tick: Duration,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            rep_threshold: 625,
            chart_floor: 400,
            sample_interval_ms: 50,
            decimation_ms: 100,
            rep_debounce: Duration::from_secs(2),
            recovery_tick: Duration::from_secs(1),
        }
    }
}

/// A finalized workout session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSession {
    /// Unique identifier
    pub id: Uuid,
    /// When the session ended
    pub date: DateTime<Utc>,
    /// Sets performed
    pub sets: u32,
    /// Average reps per set
    pub reps: u32,
    /// Average recovery seconds per set
    pub recovery_seconds: u32,
    /// Session average strain per rep
    pub strain_per_set: u32,
    /// Last set's average strain per rep
    pub strain_per_rep: u32,
    /// Largest sample of the session
    pub max_strain: u16,
    /// Last set's charted trace
    pub points: Vec<StrainPoint>,
}

/// Errors from the workout session actor.
#[derive(Debug, Error)]
pub enum WorkoutError {
    /// The actor task is gone
    #[error("Workout session actor has stopped")]
    ActorStopped,
}
