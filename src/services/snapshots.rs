//! Session snapshot persistence.
//!
//! One SQLite row per run_id, upserted on every periodic save and on stop.
//! At boot the most recent snapshot by `saved_at` is loaded so a crashed or
//! restarted process can offer the operator an explicit resume.

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, error, info};

use crate::error::AppError;
use crate::services::engine::EngineRecord;
use crate::types::SessionConfig;

/// The persisted state of one simulation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub run_id: String,
    pub engine: EngineRecord,
    pub config: SessionConfig,
    /// Millisecond Unix timestamp of the save.
    pub saved_at: i64,
}

/// SQLite store for session snapshots.
pub struct SnapshotStore {
    conn: Mutex<Connection>,
}

impl SnapshotStore {
    /// Open (or create) the store at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        info!("Snapshot store initialized");
        Ok(store)
    }

    /// In-memory store for tests.
    pub fn new_in_memory() -> Result<Self, AppError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        debug!("In-memory snapshot store initialized");
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), AppError> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS session_snapshots (
                run_id TEXT PRIMARY KEY,
                saved_at INTEGER NOT NULL,
                state_json TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_snapshots_saved_at
             ON session_snapshots(saved_at DESC)",
            [],
        )?;

        Ok(())
    }

    /// Upsert the snapshot for its run_id.
    pub fn save(&self, snapshot: &SessionSnapshot) -> Result<(), AppError> {
        let state_json = serde_json::to_string(snapshot)?;
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO session_snapshots (run_id, saved_at, state_json)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(run_id) DO UPDATE SET
                saved_at = excluded.saved_at,
                state_json = excluded.state_json",
            params![snapshot.run_id, snapshot.saved_at, state_json],
        )?;

        debug!("Saved snapshot for run {}", snapshot.run_id);
        Ok(())
    }

    /// The most recent snapshot across all runs, if any.
    pub fn load_latest(&self) -> Option<SessionSnapshot> {
        let conn = self.conn.lock().unwrap();

        let state_json: Option<String> = conn
            .query_row(
                "SELECT state_json FROM session_snapshots
                 ORDER BY saved_at DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .unwrap_or_else(|e| {
                error!("Error loading latest snapshot: {}", e);
                None
            });

        state_json.and_then(|json| match serde_json::from_str(&json) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                error!("Corrupt snapshot record skipped: {}", e);
                None
            }
        })
    }

    /// The snapshot for a specific run, if any.
    pub fn load(&self, run_id: &str) -> Option<SessionSnapshot> {
        let conn = self.conn.lock().unwrap();

        let state_json: Option<String> = conn
            .query_row(
                "SELECT state_json FROM session_snapshots WHERE run_id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()
            .unwrap_or(None);

        state_json.and_then(|json| serde_json::from_str(&json).ok())
    }
}
