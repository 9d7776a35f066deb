//! In-memory registry of unlocked user keys.

use crate::cipher::{EncryptedData, decrypt, encrypt};
use crate::encryptor::{EncryptorError, EncryptorResult, UserEncryptor};
use crate::error::CryptoResult;
use crate::key::{DerivedKey, KdfParams, Salt, derive_key};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError, RwLock};
use strongbox_types::UserId;
use tokio::sync::watch;
use tracing::debug;

/// Holds each user's key while they are unlocked.
///
/// Keys live only in memory. Locking a user drops (and zeroizes) their key
/// and flips their availability channel to `false`.
#[derive(Default)]
pub struct KeyService {
    keys: RwLock<HashMap<UserId, DerivedKey>>,
    availability: Mutex<HashMap<UserId, watch::Sender<bool>>>,
}

impl KeyService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a key for the user, replacing any existing one.
    pub fn set_user_key(&self, user_id: &UserId, key: DerivedKey) {
        self.keys
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user_id.clone(), key);
        self.publish(user_id, true);
        debug!("key loaded for user {}", user_id);
    }

    /// Derives the user's key from their password and installs it.
    pub fn unlock(
        &self,
        user_id: &UserId,
        password: &str,
        salt: &Salt,
        params: &KdfParams,
    ) -> CryptoResult<()> {
        let key = derive_key(password, salt, params)?;
        self.set_user_key(user_id, key);
        Ok(())
    }

    pub fn lock(&self, user_id: &UserId) {
        let removed = self
            .keys
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(user_id);
        if removed.is_some() {
            debug!("key dropped for user {}", user_id);
        }
        self.publish(user_id, false);
    }

    pub fn lock_all(&self) {
        let users: Vec<UserId> = self
            .keys
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(user, _)| user)
            .collect();
        for user in &users {
            self.publish(user, false);
        }
    }

    pub fn has_user_key(&self, user_id: &UserId) -> bool {
        self.keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(user_id)
    }

    fn with_key<R>(
        &self,
        user_id: &UserId,
        f: impl FnOnce(&DerivedKey) -> EncryptorResult<R>,
    ) -> EncryptorResult<R> {
        let keys = self.keys.read().unwrap_or_else(PoisonError::into_inner);
        let key = keys
            .get(user_id)
            .ok_or_else(|| EncryptorError::Unavailable(user_id.clone()))?;
        f(key)
    }

    fn publish(&self, user_id: &UserId, available: bool) {
        let mut channels = self
            .availability
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match channels.get(user_id) {
            Some(tx) => {
                tx.send_if_modified(|current| {
                    let changed = *current != available;
                    *current = available;
                    changed
                });
            }
            None => {
                let (tx, _) = watch::channel(available);
                channels.insert(user_id.clone(), tx);
            }
        }
    }
}

impl UserEncryptor for KeyService {
    fn encrypt_bytes(&self, user_id: &UserId, plaintext: &[u8]) -> EncryptorResult<String> {
        self.with_key(user_id, |key| {
            encrypt(key, plaintext)
                .map(|data| data.to_sealed_string())
                .map_err(|e| EncryptorError::Crypto(e.to_string()))
        })
    }

    fn decrypt_bytes(&self, user_id: &UserId, sealed: &str) -> EncryptorResult<Vec<u8>> {
        let data = EncryptedData::from_sealed_string(sealed)
            .map_err(|e| EncryptorError::Crypto(e.to_string()))?;
        self.with_key(user_id, |key| {
            decrypt(key, &data).map_err(|e| EncryptorError::Crypto(e.to_string()))
        })
    }

    fn is_available(&self, user_id: &UserId) -> bool {
        self.has_user_key(user_id)
    }

    fn watch_available(&self, user_id: &UserId) -> watch::Receiver<bool> {
        let available = self.has_user_key(user_id);
        let mut channels = self
            .availability
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        channels
            .entry(user_id.clone())
            .or_insert_with(|| watch::channel(available).0)
            .subscribe()
    }
}
