//! Cached, newest-first list of stored workout sessions.

use crate::storage::database::{Database, DatabaseError};
use crate::workouts::types::WorkoutSession;
use std::path::Path;

/// Session history backed by the database.
pub struct SessionStore {
    db: Database,
    /// Sorted by date, most recent first
    sessions: Vec<WorkoutSession>,
}

impl SessionStore {
    /// Open the store at a database path and load its sessions.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Self::with_database(Database::open(path)?)
    }

    /// In-memory store (for testing).
    pub fn in_memory() -> Result<Self, DatabaseError> {
        Self::with_database(Database::open_in_memory()?)
    }

    fn with_database(db: Database) -> Result<Self, DatabaseError> {
        let mut store = Self {
            db,
            sessions: Vec::new(),
        };
        store.load()?;
        Ok(store)
    }

    /// Reload the cached list from the database.
    pub fn load(&mut self) -> Result<(), DatabaseError> {
        self.sessions = self.db.list_sessions()?;
        tracing::info!("Loaded {} workout sessions", self.sessions.len());
        Ok(())
    }

    /// Cached sessions, most recent first.
    pub fn sessions(&self) -> &[WorkoutSession] {
        &self.sessions
    }

    /// Persist a session and insert it at its sorted position.
    pub fn add_session(&mut self, session: WorkoutSession) -> Result<(), DatabaseError> {
        self.db.insert_session(&session)?;
        let index = self
            .sessions
            .partition_point(|existing| existing.date >= session.date);
        self.sessions.insert(index, session);
        Ok(())
    }

    /// Delete sessions by position in [`SessionStore::sessions`].
    ///
    /// Out-of-range and repeated positions are ignored. Returns how many
    /// sessions were removed.
    pub fn delete_at(&mut self, positions: &[usize]) -> Result<usize, DatabaseError> {
        let mut positions: Vec<usize> = positions
            .iter()
            .copied()
            .filter(|&p| p < self.sessions.len())
            .collect();
        positions.sort_unstable();
        positions.dedup();

        // Highest first so earlier positions stay valid
        for &position in positions.iter().rev() {
            let id = self.sessions[position].id;
            self.db.delete_session(&id)?;
            self.sessions.remove(position);
        }

        if !positions.is_empty() {
            tracing::info!("Deleted {} workout sessions", positions.len());
        }
        Ok(positions.len())
    }
}
