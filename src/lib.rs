//! StrainSense - Wearable Strain Sensor Workout Tracker
//!
//! Connects to a BLE strain sensor, decodes its notification stream into
//! strain samples, classifies them into reps, sets and recovery, and
//! finalizes each workout into a stored session record.

pub mod recording;
pub mod sensors;
pub mod storage;
pub mod workouts;

// Re-export commonly used types
pub use sensors::link::StrainLink;
pub use storage::session_store::SessionStore;
pub use workouts::classifier::WorkoutClassifier;
pub use workouts::session::{SessionActor, SessionHandle};
