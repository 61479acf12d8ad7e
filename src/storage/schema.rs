//! Database schema definitions for finalized workout sessions.

/// SQL schema for creating all database tables.
pub const SCHEMA: &str = r#"
-- Workout sessions table
CREATE TABLE IF NOT EXISTS workout_sessions (
    id TEXT PRIMARY KEY,
    date TEXT NOT NULL,
    sets INTEGER NOT NULL,
    reps INTEGER NOT NULL,
    recovery_seconds INTEGER NOT NULL,
    strain_per_set INTEGER NOT NULL,
    strain_per_rep INTEGER NOT NULL,
    max_strain INTEGER NOT NULL,
    points_json TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_workout_sessions_date ON workout_sessions(date);
"#;

/// SQL for schema version tracking (migrations)
pub const SCHEMA_VERSION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);
"#;

/// Current schema version
pub const CURRENT_VERSION: i32 = 1;
