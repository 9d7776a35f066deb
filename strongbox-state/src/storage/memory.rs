use super::StorageBackend;
use crate::error::StateResult;
use crate::key_definition::StorageKey;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use strongbox_types::UserId;

/// Volatile backend for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<(UserId, StorageKey), Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw stored document, bypassing any provider cache.
    pub fn raw(&self, user_id: &UserId, key: &StorageKey) -> Option<Value> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(user_id.clone(), key.clone()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn get(&self, user_id: &UserId, key: &StorageKey) -> StateResult<Option<Value>> {
        Ok(self.raw(user_id, key))
    }

    async fn set(
        &self,
        user_id: &UserId,
        key: &StorageKey,
        value: Option<&Value>,
    ) -> StateResult<()> {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let slot = (user_id.clone(), key.clone());
        match value {
            Some(value) => {
                entries.insert(slot, value.clone());
            }
            None => {
                entries.remove(&slot);
            }
        }
        Ok(())
    }
}
