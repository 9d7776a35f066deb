//! SQLite-backed state storage.
//!
//! One row per (user, location, key) holding the JSON document as text.

use super::StorageBackend;
use crate::config::StateConfig;
use crate::error::{StateError, StateResult};
use crate::key_definition::StorageKey;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use strongbox_types::UserId;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS user_state (
        user_id     TEXT NOT NULL,
        location    TEXT NOT NULL,
        state_key   TEXT NOT NULL,
        value       TEXT NOT NULL,
        modified_at INTEGER NOT NULL,
        PRIMARY KEY (user_id, location, state_key)
    );
";

pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Opens (creating if needed) the database at `path`.
    pub fn open(path: &Path, config: &StateConfig) -> StateResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> StateResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StateResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

#[async_trait]
impl StorageBackend for SqliteStorage {
    async fn get(&self, user_id: &UserId, key: &StorageKey) -> StateResult<Option<Value>> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let text: Option<String> = conn
            .query_row(
                "SELECT value FROM user_state WHERE user_id = ?1 AND location = ?2 AND state_key = ?3",
                params![user_id.as_str(), key.location, key.key],
                |row| row.get(0),
            )
            .optional()?;
        text.map(|t| serde_json::from_str(&t).map_err(StateError::from))
            .transpose()
    }

    async fn set(
        &self,
        user_id: &UserId,
        key: &StorageKey,
        value: Option<&Value>,
    ) -> StateResult<()> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        match value {
            Some(value) => {
                conn.execute(
                    "INSERT INTO user_state (user_id, location, state_key, value, modified_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT (user_id, location, state_key)
                     DO UPDATE SET value = excluded.value, modified_at = excluded.modified_at",
                    params![
                        user_id.as_str(),
                        key.location,
                        key.key,
                        serde_json::to_string(value)?,
                        Utc::now().timestamp_millis()
                    ],
                )?;
            }
            None => {
                conn.execute(
                    "DELETE FROM user_state WHERE user_id = ?1 AND location = ?2 AND state_key = ?3",
                    params![user_id.as_str(), key.location, key.key],
                )?;
            }
        }
        Ok(())
    }
}
