//! SQLite-backed [`Checkpointer`]: the one required durable backend.
//!
//! Mirrors this codebase's own embedded-SQLite idiom: a `rusqlite::Connection`
//! wrapped in a mutex, schema created with `CREATE TABLE IF NOT EXISTS` at
//! open time, WAL journal mode for concurrent readers.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::EngineError;
use crate::message::{InteractionMode, merge};
use crate::state::AgentState;

use super::traits::{Checkpoint, Checkpointer, StateDelta};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS checkpoints (
    thread_id TEXT NOT NULL,
    version INTEGER NOT NULL,
    state_json TEXT NOT NULL,
    next_json TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (thread_id, version)
);

CREATE INDEX IF NOT EXISTS idx_checkpoints_thread ON checkpoints (thread_id);
"#;

pub struct SqliteCheckpointer {
    conn: Mutex<Connection>,
}

impl SqliteCheckpointer {
    /// Open (or create) a SQLite database at `path` and initialise the
    /// schema. Primary constructor for production use.
    pub fn open(path: &std::path::Path) -> Result<Self, String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| format!("failed to create checkpoint dir: {e}"))?;
        }
        let conn = Connection::open(path).map_err(|e| format!("SQLite open error: {e}"))?;
        conn.query_row("PRAGMA journal_mode=WAL", [], |_| Ok(())).map_err(|e| format!("SQLite PRAGMA error: {e}"))?;
        conn.execute_batch(SCHEMA_SQL).map_err(|e| format!("SQLite schema error: {e}"))?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// In-memory SQLite database — useful when a real Checkpointer trait
    /// object is needed but durability across a restart is not.
    pub fn in_memory() -> Result<Self, String> {
        let conn = Connection::open_in_memory().map_err(|e| format!("SQLite open error: {e}"))?;
        conn.execute_batch(SCHEMA_SQL).map_err(|e| format!("SQLite schema error: {e}"))?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn latest_row(conn: &Connection, thread_id: &str) -> Result<Option<(String, String, u64)>, String> {
        conn.query_row(
            "SELECT state_json, next_json, version FROM checkpoints WHERE thread_id = ?1 ORDER BY version DESC LIMIT 1",
            params![thread_id],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, i64>(2)? as u64)),
        )
        .optional()
        .map_err(|e| format!("SQLite read error: {e}"))
    }

    fn insert_row(conn: &Connection, thread_id: &str, checkpoint: &Checkpoint) -> Result<(), String> {
        let state_json = serde_json::to_string(&checkpoint.state).map_err(|e| format!("serialise error: {e}"))?;
        let next_json = serde_json::to_string(&checkpoint.next).map_err(|e| format!("serialise error: {e}"))?;
        conn.execute(
            "INSERT INTO checkpoints (thread_id, version, state_json, next_json, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![thread_id, checkpoint.version as i64, state_json, next_json, Utc::now().to_rfc3339()],
        )
        .map_err(|e| format!("SQLite write error: {e}"))?;
        Ok(())
    }
}

#[async_trait]
impl Checkpointer for SqliteCheckpointer {
    async fn get_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>, EngineError> {
        let conn = self.conn.lock().map_err(|e| EngineError::CheckpointerWrite(e.to_string()))?;
        let row = Self::latest_row(&conn, thread_id).map_err(EngineError::CheckpointerWrite)?;
        let Some((state_json, next_json, version)) = row else { return Ok(None) };
        let state: AgentState = serde_json::from_str(&state_json)
            .map_err(|e| EngineError::CheckpointerWrite(format!("deserialise state: {e}")))?;
        let next: Vec<String> = serde_json::from_str(&next_json)
            .map_err(|e| EngineError::CheckpointerWrite(format!("deserialise next: {e}")))?;
        Ok(Some(Checkpoint { state, next, version }))
    }

    async fn put(&self, thread_id: &str, checkpoint: Checkpoint) -> Result<(), EngineError> {
        let conn = self.conn.lock().map_err(|e| EngineError::CheckpointerWrite(e.to_string()))?;
        let current = Self::latest_row(&conn, thread_id).map_err(EngineError::CheckpointerWrite)?;
        let next_version = current.map(|(_, _, v)| v + 1).unwrap_or(1);
        if checkpoint.version < next_version {
            return Err(EngineError::CheckpointerWrite(format!(
                "stale write: thread {thread_id} expected version >= {next_version}, got {}",
                checkpoint.version
            )));
        }
        Self::insert_row(&conn, thread_id, &checkpoint).map_err(EngineError::CheckpointerWrite)
    }

    async fn update_partial(
        &self,
        thread_id: &str,
        delta: StateDelta,
        next: Vec<String>,
        produced_by: &str,
    ) -> Result<Checkpoint, EngineError> {
        let conn = self.conn.lock().map_err(|e| EngineError::CheckpointerWrite(e.to_string()))?;
        let current = Self::latest_row(&conn, thread_id).map_err(EngineError::CheckpointerWrite)?;

        let (mut state, prior_version) = match current {
            Some((state_json, _, version)) => {
                let state: AgentState = serde_json::from_str(&state_json)
                    .map_err(|e| EngineError::CheckpointerWrite(format!("deserialise state: {e}")))?;
                (state, version)
            }
            None => (AgentState::new(InteractionMode::Text), 0),
        };

        state.messages = merge(&state.messages, &delta.messages)
            .map_err(|e| EngineError::CheckpointerWrite(format!("{produced_by}: {e}")))?;
        if let Some(role) = delta.current_role {
            state.current_role = role;
        }

        let checkpoint = Checkpoint { state, next, version: prior_version + 1 };
        Self::insert_row(&conn, thread_id, &checkpoint).map_err(EngineError::CheckpointerWrite)?;
        Ok(checkpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[tokio::test]
    async fn round_trip_through_sqlite() {
        let cp = SqliteCheckpointer::in_memory().unwrap();
        let delta = StateDelta { messages: vec![Message::user("hi")], current_role: None };
        let written = cp.update_partial("t1", delta, vec!["chatbot".into()], "driver").await.unwrap();

        let read = cp.get_latest("t1").await.unwrap().unwrap();
        assert_eq!(read.version, written.version);
        assert_eq!(read.state.messages.len(), 1);
        assert_eq!(read.next, vec!["chatbot".to_string()]);
    }

    #[tokio::test]
    async fn versions_are_monotonic_across_updates() {
        let cp = SqliteCheckpointer::in_memory().unwrap();
        let v1 = cp.update_partial("t1", StateDelta::default(), vec![], "driver").await.unwrap();
        let v2 = cp.update_partial("t1", StateDelta::default(), vec![], "driver").await.unwrap();
        assert!(v2.version > v1.version);
    }

    #[tokio::test]
    async fn put_rejects_stale_version() {
        let cp = SqliteCheckpointer::in_memory().unwrap();
        let checkpoint = cp.update_partial("t1", StateDelta::default(), vec![], "driver").await.unwrap();
        assert!(cp.put("t1", checkpoint).await.is_err());
    }

    #[tokio::test]
    async fn get_latest_none_for_unknown_thread() {
        let cp = SqliteCheckpointer::in_memory().unwrap();
        assert!(cp.get_latest("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn survives_reopen_of_file_backed_database() {
        let dir = std::env::temp_dir().join(format!("jarvis-checkpoint-test-{}", uuid::Uuid::new_v4()));
        let path = dir.join("checkpoints.sqlite3");

        {
            let cp = SqliteCheckpointer::open(&path).unwrap();
            cp.update_partial("t1", StateDelta { messages: vec![Message::user("hi")], current_role: None }, vec![], "driver")
                .await
                .unwrap();
        }

        let reopened = SqliteCheckpointer::open(&path).unwrap();
        let read = reopened.get_latest("t1").await.unwrap().unwrap();
        assert_eq!(read.state.messages.len(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
