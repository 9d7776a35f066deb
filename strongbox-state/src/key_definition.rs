//! Addresses and lifecycle rules for user-scoped state.

use crate::error::StateResult;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Bound satisfied by every value that can live in a state store.
pub trait StateValue: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> StateValue for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

/// Namespace grouping related keys (e.g. everything the generator owns).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StateLocation(&'static str);

impl StateLocation {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

/// Fully qualified storage address, minus the owning user.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StorageKey {
    pub location: String,
    pub key: String,
}

impl StorageKey {
    pub fn new(location: StateLocation, key: impl Into<String>) -> Self {
        Self {
            location: location.name().to_string(),
            key: key.into(),
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.location, self.key)
    }
}

/// Account lifecycle events that can wipe a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClearEvent {
    Logout,
    Lock,
}

type Deserializer<T> = Arc<dyn Fn(Value) -> StateResult<T> + Send + Sync>;

/// Describes one user-scoped value: where it lives, when it is wiped, and
/// how its stored JSON is turned back into `T`.
pub struct UserKeyDefinition<T> {
    location: StateLocation,
    key: String,
    clear_on: Vec<ClearEvent>,
    deserializer: Deserializer<T>,
}

impl<T> Clone for UserKeyDefinition<T> {
    fn clone(&self) -> Self {
        Self {
            location: self.location,
            key: self.key.clone(),
            clear_on: self.clear_on.clone(),
            deserializer: Arc::clone(&self.deserializer),
        }
    }
}

impl<T> fmt::Debug for UserKeyDefinition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserKeyDefinition")
            .field("location", &self.location)
            .field("key", &self.key)
            .field("clear_on", &self.clear_on)
            .finish()
    }
}

impl<T: StateValue> UserKeyDefinition<T> {
    pub fn new(location: StateLocation, key: impl Into<String>, clear_on: &[ClearEvent]) -> Self {
        Self {
            location,
            key: key.into(),
            clear_on: clear_on.to_vec(),
            deserializer: Arc::new(|value: Value| -> StateResult<T> {
                Ok(serde_json::from_value(value)?)
            }),
        }
    }
}

impl<T> UserKeyDefinition<T> {
    /// Replaces the JSON decoder, e.g. to upgrade an older stored shape.
    pub fn with_deserializer(
        mut self,
        deserializer: impl Fn(Value) -> StateResult<T> + Send + Sync + 'static,
    ) -> Self {
        self.deserializer = Arc::new(deserializer);
        self
    }

    pub fn location(&self) -> StateLocation {
        self.location
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn clear_on(&self) -> &[ClearEvent] {
        &self.clear_on
    }

    pub fn storage_key(&self) -> StorageKey {
        StorageKey::new(self.location, self.key.clone())
    }

    pub fn deserialize(&self, value: Value) -> StateResult<T> {
        (self.deserializer)(value)
    }

    pub(crate) fn deserializer(&self) -> Deserializer<T> {
        Arc::clone(&self.deserializer)
    }
}
