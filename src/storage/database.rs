//! Database operations using rusqlite.

use crate::storage::schema::{CURRENT_VERSION, SCHEMA, SCHEMA_VERSION_TABLE};
use crate::workouts::types::{StrainPoint, WorkoutSession};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Result as SqliteResult};
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

const SESSION_COLUMNS: &str = "id, date, sets, reps, recovery_seconds, strain_per_set,
     strain_per_rep, max_strain, points_json";

/// Database wrapper for SQLite operations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create a database at the given path.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DatabaseError::IoError(e.to_string()))?;
        }

        let conn =
            Connection::open(path).map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        let db = Self { conn };
        db.initialize()?;

        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        let db = Self { conn };
        db.initialize()?;

        Ok(db)
    }

    fn initialize(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(SCHEMA_VERSION_TABLE)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

        let current_version = self.get_schema_version()?;

        if current_version < CURRENT_VERSION {
            self.migrate(current_version)?;
        }

        Ok(())
    }

    /// Get the current schema version.
    pub fn get_schema_version(&self) -> Result<i32, DatabaseError> {
        let result: SqliteResult<i32> = self.conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        );

        match result {
            Ok(version) => Ok(version),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
            Err(e) => Err(DatabaseError::QueryFailed(e.to_string())),
        }
    }

    fn migrate(&self, from_version: i32) -> Result<(), DatabaseError> {
        if from_version < 1 {
            self.conn
                .execute_batch(SCHEMA)
                .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

            self.conn
                .execute(
                    "INSERT INTO schema_version (version, applied_at) VALUES (?, datetime('now'))",
                    [CURRENT_VERSION],
                )
                .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

            tracing::info!("Database migrated to version {}", CURRENT_VERSION);
        }

        Ok(())
    }

    // ========== Workout session CRUD ==========

    /// Insert a finalized session.
    pub fn insert_session(&self, session: &WorkoutSession) -> Result<(), DatabaseError> {
        let points_json = serde_json::to_string(&session.points)
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;

        self.conn
            .execute(
                "INSERT INTO workout_sessions (id, date, sets, reps, recovery_seconds,
                 strain_per_set, strain_per_rep, max_strain, points_json, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    session.id.to_string(),
                    session.date.to_rfc3339(),
                    session.sets,
                    session.reps,
                    session.recovery_seconds,
                    session.strain_per_set,
                    session.strain_per_rep,
                    session.max_strain,
                    points_json,
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(err, _)
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    DatabaseError::ConstraintViolation(format!("Session {}", session.id))
                }
                other => DatabaseError::QueryFailed(other.to_string()),
            })?;

        tracing::debug!("Stored workout session {}", session.id);
        Ok(())
    }

    /// Get a session by ID.
    pub fn get_session(&self, id: &Uuid) -> Result<Option<WorkoutSession>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM workout_sessions WHERE id = ?1",
            SESSION_COLUMNS
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let result = stmt.query_row(params![id.to_string()], SessionRow::from_row);

        match result {
            Ok(row) => Ok(Some(row.into_session()?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DatabaseError::QueryFailed(e.to_string())),
        }
    }

    /// List all sessions, most recent first.
    pub fn list_sessions(&self) -> Result<Vec<WorkoutSession>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM workout_sessions ORDER BY date DESC",
            SESSION_COLUMNS
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let rows = stmt
            .query_map([], SessionRow::from_row)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let mut sessions = Vec::new();
        for row in rows {
            let row = row.map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
            sessions.push(row.into_session()?);
        }

        Ok(sessions)
    }

    /// Delete a session by ID.
    pub fn delete_session(&self, id: &Uuid) -> Result<(), DatabaseError> {
        let rows_affected = self
            .conn
            .execute(
                "DELETE FROM workout_sessions WHERE id = ?1",
                params![id.to_string()],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        if rows_affected == 0 {
            return Err(DatabaseError::NotFound(format!("Session {}", id)));
        }

        Ok(())
    }

    /// Count stored sessions.
    pub fn count_sessions(&self) -> Result<usize, DatabaseError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM workout_sessions", [], |row| row.get(0))
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(count as usize)
    }
}

/// Raw column values of a `workout_sessions` row.
struct SessionRow {
    id: String,
    date: String,
    sets: u32,
    reps: u32,
    recovery_seconds: u32,
    strain_per_set: u32,
    strain_per_rep: u32,
    max_strain: u16,
    points_json: String,
}

impl SessionRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            date: row.get(1)?,
            sets: row.get(2)?,
            reps: row.get(3)?,
            recovery_seconds: row.get(4)?,
            strain_per_set: row.get(5)?,
            strain_per_rep: row.get(6)?,
            max_strain: row.get(7)?,
            points_json: row.get(8)?,
        })
    }

    fn into_session(self) -> Result<WorkoutSession, DatabaseError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| DatabaseError::DeserializationError(format!("Invalid UUID: {}", e)))?;

        let date = DateTime::parse_from_rfc3339(&self.date)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| DatabaseError::DeserializationError(format!("Invalid date: {}", e)))?;

        let points: Vec<StrainPoint> = serde_json::from_str(&self.points_json).map_err(|e| {
            DatabaseError::DeserializationError(format!("Invalid points JSON: {}", e))
        })?;

        Ok(WorkoutSession {
            id,
            date,
            sets: self.sets,
            reps: self.reps,
            recovery_seconds: self.recovery_seconds,
            strain_per_set: self.strain_per_set,
            strain_per_rep: self.strain_per_rep,
            max_strain: self.max_strain,
            points,
        })
    }
}

/// Database errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}
