//! Registry of live state slots and the plain (unencrypted) user state.
//!
//! Every `(user, key)` pair maps to one slot. A slot owns the watch channel
//! its subscribers read from and an async write lock that serializes every
//! read-modify-write against the backend. Slots are created on first use and
//! released with [`StateProvider::evict`].

use crate::config::StateConfig;
use crate::error::StateResult;
use crate::key_definition::{ClearEvent, StateValue, StorageKey, UserKeyDefinition};
use crate::storage::{MemoryStorage, SqliteStorage, StorageBackend};
use crate::stream::{Decoder, Snapshot, StateStream};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use strongbox_types::UserId;
use tokio::sync::watch;
use tracing::{debug, warn};

type SlotKey = (UserId, StorageKey);

struct Slot {
    tx: watch::Sender<Snapshot>,
    write_lock: tokio::sync::Mutex<()>,
}

/// Outcome of a read-modify-write step.
pub(crate) enum Write<T> {
    /// Leave storage untouched.
    Skip,
    /// Replace the stored value (`None` removes it).
    Replace(Option<T>),
}

pub struct StateProvider {
    backend: Arc<dyn StorageBackend>,
    slots: Mutex<HashMap<SlotKey, Arc<Slot>>>,
    lifecycle: Mutex<HashMap<UserId, HashMap<StorageKey, Vec<ClearEvent>>>>,
}

impl StateProvider {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            slots: Mutex::new(HashMap::new()),
            lifecycle: Mutex::new(HashMap::new()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Builds a provider over the backend selected by `config`.
    pub fn open(config: &StateConfig) -> StateResult<Self> {
        let backend: Arc<dyn StorageBackend> = match &config.database_path {
            Some(path) => Arc::new(SqliteStorage::open(path, config)?),
            None => Arc::new(MemoryStorage::new()),
        };
        Ok(Self::new(backend))
    }

    /// Returns a handle to `definition` for `user_id`.
    ///
    /// The key's clear-on events are registered so [`StateProvider::clear`]
    /// can find it later.
    pub fn get_user<T: StateValue>(
        self: &Arc<Self>,
        user_id: &UserId,
        definition: &UserKeyDefinition<T>,
    ) -> UserState<T> {
        if !definition.clear_on().is_empty() {
            self.lifecycle
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(user_id.clone())
                .or_default()
                .insert(definition.storage_key(), definition.clear_on().to_vec());
        }
        UserState {
            provider: Arc::clone(self),
            user_id: user_id.clone(),
            definition: definition.clone(),
        }
    }

    /// Overwrites a value directly, bypassing update options.
    pub async fn set_user_state<T: StateValue>(
        &self,
        user_id: &UserId,
        definition: &UserKeyDefinition<T>,
        value: Option<T>,
    ) -> StateResult<()> {
        let value = value.map(|v| serde_json::to_value(&v)).transpose()?;
        self.modify(user_id, &definition.storage_key(), |_| {
            Ok((Write::Replace(value), ()))
        })
        .await
    }

    /// Wipes every key registered for `user_id` that declared `event`.
    /// Returns how many keys were cleared.
    pub async fn clear(&self, user_id: &UserId, event: ClearEvent) -> StateResult<usize> {
        let keys: Vec<StorageKey> = self
            .lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_id)
            .map(|keys| {
                keys.iter()
                    .filter(|(_, events)| events.contains(&event))
                    .map(|(key, _)| key.clone())
                    .collect()
            })
            .unwrap_or_default();

        for key in &keys {
            self.modify(user_id, key, |_| Ok((Write::Replace(None), ())))
                .await?;
        }
        debug!("cleared {} keys for user {} on {:?}", keys.len(), user_id, event);
        Ok(keys.len())
    }

    /// Drops idle slots belonging to `user_id`. Slots with live subscribers
    /// are kept.
    pub fn evict(&self, user_id: &UserId) -> usize {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let before = slots.len();
        slots.retain(|(owner, _), slot| owner != user_id || slot.tx.receiver_count() > 0);
        before - slots.len()
    }

    pub(crate) fn subscribe<T>(
        &self,
        user_id: &UserId,
        key: &StorageKey,
        decode: Decoder<T>,
    ) -> StateStream<T> {
        let slot = self.slot(user_id, key);
        StateStream::new(slot.tx.subscribe(), decode)
    }

    /// Atomic read-modify-write of one slot. `f` sees the stored value and
    /// decides whether to write; the new value is broadcast on success.
    pub(crate) async fn modify<R>(
        &self,
        user_id: &UserId,
        key: &StorageKey,
        f: impl FnOnce(Option<Value>) -> StateResult<(Write<Value>, R)>,
    ) -> StateResult<R> {
        let slot = self.slot(user_id, key);
        let _guard = slot.write_lock.lock().await;

        let current = self.backend.get(user_id, key).await?;
        let (write, result) = f(current)?;
        if let Write::Replace(value) = write {
            self.backend.set(user_id, key, value.as_ref()).await?;
            slot.tx.send_replace(Snapshot::Ready(value));
        }
        Ok(result)
    }

    /// Reads and clears a slot in one step.
    pub(crate) async fn take(&self, user_id: &UserId, key: &StorageKey) -> StateResult<Option<Value>> {
        self.modify(user_id, key, |current| match current {
            Some(value) => Ok((Write::Replace(None), Some(value))),
            None => Ok((Write::Skip, None)),
        })
        .await
    }

    /// Puts a value back unless something newer was written meanwhile.
    pub(crate) async fn restore_if_empty(
        &self,
        user_id: &UserId,
        key: &StorageKey,
        value: Value,
    ) -> StateResult<bool> {
        self.modify(user_id, key, |current| match current {
            Some(_) => Ok((Write::Skip, false)),
            None => Ok((Write::Replace(Some(value)), true)),
        })
        .await
    }

    fn slot(&self, user_id: &UserId, key: &StorageKey) -> Arc<Slot> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = slots.get(&(user_id.clone(), key.clone())) {
            return Arc::clone(slot);
        }

        let (tx, _) = watch::channel(Snapshot::Pending);
        let slot = Arc::new(Slot {
            tx,
            write_lock: tokio::sync::Mutex::new(()),
        });
        slots.insert((user_id.clone(), key.clone()), Arc::clone(&slot));
        drop(slots);

        let backend = Arc::clone(&self.backend);
        let loading = Arc::clone(&slot);
        let user_id = user_id.clone();
        let key = key.clone();
        tokio::spawn(async move {
            let _guard = loading.write_lock.lock().await;
            let pending = matches!(*loading.tx.borrow(), Snapshot::Pending);
            if !pending {
                return;
            }
            let snapshot = match backend.get(&user_id, &key).await {
                Ok(value) => Snapshot::Ready(value),
                Err(e) => {
                    warn!("failed to load {} for user {}: {}", key, user_id, e);
                    Snapshot::Failed(e)
                }
            };
            loading.tx.send_replace(snapshot);
        });
        slot
    }
}

/// Options for [`ActiveState::update_with`].
pub struct UpdateOptions<T, C> {
    /// Veto: when it returns `false` the update is skipped and the current
    /// value is returned unchanged.
    pub should_update: Option<Box<dyn FnOnce(Option<&T>, Option<&C>) -> bool + Send>>,
    /// Auxiliary value whose latest emission is passed to the update.
    pub combine_latest_with: Option<watch::Receiver<C>>,
}

impl<T, C> Default for UpdateOptions<T, C> {
    fn default() -> Self {
        Self {
            should_update: None,
            combine_latest_with: None,
        }
    }
}

impl<T, C: Clone> UpdateOptions<T, C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn should_update(
        mut self,
        f: impl FnOnce(Option<&T>, Option<&C>) -> bool + Send + 'static,
    ) -> Self {
        self.should_update = Some(Box::new(f));
        self
    }

    pub fn combine_latest_with(mut self, rx: watch::Receiver<C>) -> Self {
        self.combine_latest_with = Some(rx);
        self
    }

    pub(crate) fn latest(&self) -> Option<C> {
        self.combine_latest_with.as_ref().map(|rx| rx.borrow().clone())
    }
}

/// Read/update contract shared by every user-scoped store.
#[async_trait]
pub trait ActiveState<T: StateValue>: Send + Sync {
    fn user_id(&self) -> &UserId;

    /// Subscribes to the value. Emits the current value first.
    fn state(&self) -> StateStream<T>;

    /// Serialized update. Returns the value now stored (or the unchanged
    /// value when `should_update` vetoed).
    async fn update_with<C, F>(&self, f: F, options: UpdateOptions<T, C>) -> StateResult<Option<T>>
    where
        C: Clone + Send + Sync + 'static,
        F: FnOnce(Option<T>, Option<&C>) -> Option<T> + Send + 'static;

    async fn update<F>(&self, f: F) -> StateResult<Option<T>>
    where
        F: FnOnce(Option<T>) -> Option<T> + Send + 'static,
    {
        self.update_with(move |current, _: Option<&()>| f(current), UpdateOptions::default())
            .await
    }
}

/// Plain JSON state for one user and key.
pub struct UserState<T> {
    provider: Arc<StateProvider>,
    user_id: UserId,
    definition: UserKeyDefinition<T>,
}

impl<T> Clone for UserState<T> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            user_id: self.user_id.clone(),
            definition: self.definition.clone(),
        }
    }
}

impl<T: StateValue> UserState<T> {
    pub fn definition(&self) -> &UserKeyDefinition<T> {
        &self.definition
    }

    /// Reads the stored value directly from the backend.
    pub async fn get(&self) -> StateResult<Option<T>> {
        self.try_update(|current| Ok((Write::Skip, current))).await
    }

    /// Serialized read-modify-write on decoded values.
    pub(crate) async fn try_update<R>(
        &self,
        f: impl FnOnce(Option<T>) -> StateResult<(Write<T>, R)>,
    ) -> StateResult<R> {
        let definition = &self.definition;
        self.provider
            .modify(&self.user_id, &definition.storage_key(), |raw| {
                let current = raw.map(|v| definition.deserialize(v)).transpose()?;
                let (write, result) = f(current)?;
                let write = match write {
                    Write::Skip => Write::Skip,
                    Write::Replace(value) => {
                        Write::Replace(value.map(|v| serde_json::to_value(&v)).transpose()?)
                    }
                };
                Ok((write, result))
            })
            .await
    }
}

#[async_trait]
impl<T: StateValue> ActiveState<T> for UserState<T> {
    fn user_id(&self) -> &UserId {
        &self.user_id
    }

    fn state(&self) -> StateStream<T> {
        self.provider.subscribe(
            &self.user_id,
            &self.definition.storage_key(),
            self.definition.deserializer(),
        )
    }

    async fn update_with<C, F>(&self, f: F, options: UpdateOptions<T, C>) -> StateResult<Option<T>>
    where
        C: Clone + Send + Sync + 'static,
        F: FnOnce(Option<T>, Option<&C>) -> Option<T> + Send + 'static,
    {
        let combined = options.latest();
        self.try_update(move |current| {
            if let Some(should_update) = options.should_update {
                if !should_update(current.as_ref(), combined.as_ref()) {
                    return Ok((Write::Skip, current));
                }
            }
            let next = f(current, combined.as_ref());
            Ok((Write::Replace(next.clone()), next))
        })
        .await
    }
}
