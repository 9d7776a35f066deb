//! Durable key/value backends behind [`crate::StateProvider`].

mod memory;
mod sqlite;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

use crate::error::StateResult;
use crate::key_definition::StorageKey;
use async_trait::async_trait;
use serde_json::Value;
use strongbox_types::UserId;

/// Stores one JSON document per (user, key).
///
/// Backends only need to be individually atomic per call. Read-modify-write
/// sequences are serialized by the provider.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn get(&self, user_id: &UserId, key: &StorageKey) -> StateResult<Option<Value>>;

    /// Writes `value`, or removes the entry when `value` is `None`.
    async fn set(&self, user_id: &UserId, key: &StorageKey, value: Option<&Value>)
    -> StateResult<()>;
}
