//! State layer configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// How long a decrypted cache outlives its last subscriber.
pub const DEFAULT_CLEANUP_DELAY: Duration = Duration::from_secs(60);

/// Configuration for [`crate::StateProvider::open`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// SQLite database file. `None` keeps all state in memory.
    pub database_path: Option<PathBuf>,

    /// SQLite busy timeout in milliseconds.
    pub busy_timeout_ms: u64,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            busy_timeout_ms: 5_000,
        }
    }
}
