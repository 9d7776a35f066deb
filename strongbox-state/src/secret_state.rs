//! Encrypted per-user state with a shared decryption cache.
//!
//! Items are classified, their secret parts sealed with the owner's key and
//! the result stored under the definition's encrypted key. Subscribers share
//! one decryption task. The task outlives its last subscriber by the key's
//! cleanup delay so quick re-subscriptions reuse the decrypted value, then
//! tears the cache down.

use crate::error::StateResult;
use crate::provider::{ActiveState, StateProvider, UpdateOptions, UserState, Write};
use crate::secret_key::{ClassifiedFormat, SecretKeyDefinition, SecretLayout};
use crate::stream::{Decoder, Snapshot, StateStream};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use strongbox_crypto::UserEncryptor;
use strongbox_types::UserId;
use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};
use tracing::debug;

type EncryptedItems<Id> = Vec<ClassifiedFormat<Id>>;
type SharedCache = Arc<Mutex<Option<Arc<watch::Sender<Snapshot>>>>>;

struct Codec<L: SecretLayout> {
    user_id: UserId,
    definition: SecretKeyDefinition<L>,
    encryptor: Arc<dyn UserEncryptor>,
}

impl<L: SecretLayout> Codec<L> {
    fn encrypt(&self, outer: L::Outer) -> StateResult<EncryptedItems<L::Id>> {
        let classifier = self.definition.classifier();
        self.definition
            .deconstruct(outer)
            .into_iter()
            .map(|(id, item)| {
                let classified = classifier.classify(&item)?;
                let plaintext = serde_json::to_vec(&classified.secret)?;
                let secret = self.encryptor.encrypt_bytes(&self.user_id, &plaintext)?;
                Ok(ClassifiedFormat {
                    id,
                    secret,
                    disclosed: classified.disclosed,
                })
            })
            .collect()
    }

    fn decrypt(&self, stored: Option<EncryptedItems<L::Id>>) -> StateResult<Option<L::Outer>> {
        let Some(stored) = stored else {
            return Ok(None);
        };
        let classifier = self.definition.classifier();
        let items = stored
            .into_iter()
            .map(|entry| {
                let plaintext = self.encryptor.decrypt_bytes(&self.user_id, &entry.secret)?;
                let secret: Value = serde_json::from_slice(&plaintext)?;
                let item = classifier.declassify(Value::Object(entry.disclosed), secret)?;
                Ok((entry.id, item))
            })
            .collect::<StateResult<Vec<_>>>()?;
        Ok(self.definition.reconstruct(items))
    }

    fn snapshot(&self, stored: Option<EncryptedItems<L::Id>>) -> Snapshot {
        let decrypted = self
            .decrypt(stored)
            .and_then(|outer| Ok(outer.map(|o| serde_json::to_value(&o)).transpose()?));
        match decrypted {
            Ok(value) => Snapshot::Ready(value),
            Err(e) => Snapshot::Failed(e),
        }
    }
}

/// Encrypted state for one user and one [`SecretKeyDefinition`].
pub struct SecretState<L: SecretLayout> {
    codec: Arc<Codec<L>>,
    encrypted: UserState<EncryptedItems<L::Id>>,
    cache: SharedCache,
}

impl<L: SecretLayout> SecretState<L> {
    pub fn from(
        user_id: &UserId,
        definition: SecretKeyDefinition<L>,
        provider: &Arc<StateProvider>,
        encryptor: Arc<dyn UserEncryptor>,
    ) -> Self {
        let encrypted = provider.get_user(user_id, &definition.to_encrypted_state_key());
        Self {
            codec: Arc::new(Codec {
                user_id: user_id.clone(),
                definition,
                encryptor,
            }),
            encrypted,
            cache: Arc::new(Mutex::new(None)),
        }
    }

    /// Current decrypted value, read straight from storage.
    pub async fn get(&self) -> StateResult<Option<L::Outer>> {
        let stored = self.encrypted.get().await?;
        self.codec.decrypt(stored)
    }

    /// True while a decryption task is running for this state.
    pub fn is_cached(&self) -> bool {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn decoder() -> Decoder<L::Outer> {
        Arc::new(|value: Value| -> StateResult<L::Outer> { Ok(serde_json::from_value(value)?) })
    }
}

#[async_trait]
impl<L: SecretLayout> ActiveState<L::Outer> for SecretState<L> {
    fn user_id(&self) -> &UserId {
        &self.codec.user_id
    }

    fn state(&self) -> StateStream<L::Outer> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(tx) = cache.as_ref() {
            return StateStream::new(tx.subscribe(), Self::decoder());
        }

        let (tx, rx) = watch::channel(Snapshot::Pending);
        let tx = Arc::new(tx);
        *cache = Some(Arc::clone(&tx));
        drop(cache);

        let user_id = &self.codec.user_id;
        tokio::spawn(share_decrypted(
            Arc::clone(&self.codec),
            self.encrypted.state(),
            self.codec.encryptor.watch_available(user_id),
            tx,
            Arc::clone(&self.cache),
        ));
        StateStream::new(rx, Self::decoder())
    }

    async fn update_with<C, F>(
        &self,
        f: F,
        options: UpdateOptions<L::Outer, C>,
    ) -> StateResult<Option<L::Outer>>
    where
        C: Clone + Send + Sync + 'static,
        F: FnOnce(Option<L::Outer>, Option<&C>) -> Option<L::Outer> + Send + 'static,
    {
        let codec = Arc::clone(&self.codec);
        let combined = options.latest();
        self.encrypted
            .try_update(move |stored| {
                let current = codec.decrypt(stored)?;
                if let Some(should_update) = options.should_update {
                    if !should_update(current.as_ref(), combined.as_ref()) {
                        return Ok((Write::Skip, current));
                    }
                }
                let next = f(current, combined.as_ref());
                let encrypted = next.clone().map(|outer| codec.encrypt(outer)).transpose()?;
                Ok((Write::Replace(encrypted), next))
            })
            .await
    }
}

/// Decrypts every change of the encrypted slot (and every change in key
/// availability) into the shared cache until the cache has been idle for the
/// cleanup delay.
async fn share_decrypted<L: SecretLayout>(
    codec: Arc<Codec<L>>,
    mut source: StateStream<EncryptedItems<L::Id>>,
    mut available: watch::Receiver<bool>,
    tx: Arc<watch::Sender<Snapshot>>,
    cache: SharedCache,
) {
    let delay: Duration = codec.definition.cleanup_delay();
    let mut latest: Option<Option<EncryptedItems<L::Id>>> = None;
    let mut idle_since: Option<Instant> = None;
    let mut watching_key = true;

    loop {
        if tx.receiver_count() == 0 {
            idle_since.get_or_insert_with(Instant::now);
        } else {
            idle_since = None;
        }
        let deadline = idle_since.map(|since| since + delay);

        tokio::select! {
            next = source.next() => match next {
                Some(Ok(stored)) => {
                    tx.send_replace(codec.snapshot(stored.clone()));
                    latest = Some(stored);
                }
                Some(Err(e)) => {
                    tx.send_replace(Snapshot::Failed(e));
                }
                None => break,
            },
            changed = available.changed(), if watching_key => {
                if changed.is_err() {
                    watching_key = false;
                    continue;
                }
                let _ = available.borrow_and_update();
                if let Some(stored) = &latest {
                    tx.send_replace(codec.snapshot(stored.clone()));
                }
            }
            _ = tx.closed(), if deadline.is_none() => {}
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if release_cache(&cache, &tx, &codec.user_id) {
                    return;
                }
            }
        }
    }

    release_cache(&cache, &tx, &codec.user_id);
}

/// Detaches `tx` from the cache if nobody is subscribed. Runs under the cache
/// lock so a concurrent `state()` either sees the old sender before teardown
/// or starts a fresh task after it.
fn release_cache(cache: &SharedCache, tx: &Arc<watch::Sender<Snapshot>>, user_id: &UserId) -> bool {
    let mut cache = cache.lock().unwrap_or_else(PoisonError::into_inner);
    if tx.receiver_count() > 0 {
        return false;
    }
    if cache.as_ref().is_some_and(|current| Arc::ptr_eq(current, tx)) {
        *cache = None;
    }
    debug!("decrypted cache for user {} torn down", user_id);
    true
}
