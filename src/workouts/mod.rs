//! Workout module: rep/set classification, session aggregation and the
//! actor that owns the live workout state.

pub mod aggregator;
pub mod classifier;
pub mod session;
pub mod types;

pub use aggregator::finalize_session;
pub use classifier::{ClassifierOutput, WorkoutClassifier};
pub use session::{SessionActor, SessionCommand, SessionHandle};
pub use types::{
    ClassifierConfig, RepDetector, StrainPoint, TimerAction, TimerId, TimerKind, WorkoutError,
    WorkoutEvent, WorkoutMetrics, WorkoutSession, WorkoutState,
};
