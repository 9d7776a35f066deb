//! Shared helpers for state integration tests.
#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use strongbox_crypto::{
    DerivedKey, EncryptorResult, KeyService, UserEncryptor, generate_random_key,
};
use strongbox_state::storage::MemoryStorage;
use strongbox_state::{StateLocation, StateProvider, StateResult, StateStream};
use strongbox_types::UserId;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

pub const TEST_LOCATION: StateLocation = StateLocation::new("test");

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Login {
    pub username: String,
    pub password: String,
}

pub fn login(username: &str, password: &str) -> Login {
    Login {
        username: username.into(),
        password: password.into(),
    }
}

/// Provider over a memory backend the test can inspect.
pub fn memory_provider() -> (Arc<StateProvider>, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let provider = Arc::new(StateProvider::new(storage.clone()));
    (provider, storage)
}

/// Key service with `user` unlocked; also returns the key for re-unlocking.
pub fn unlocked(user: &UserId) -> (Arc<KeyService>, DerivedKey) {
    let keys = Arc::new(KeyService::new());
    let key = generate_random_key();
    keys.set_user_key(user, key.clone());
    (keys, key)
}

/// Next emission, failing the test if nothing arrives.
pub async fn next<T>(stream: &mut StateStream<T>) -> StateResult<Option<T>> {
    tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .expect("timed out waiting for state")
        .expect("state stream closed")
}

/// Waits until the stream emits a value matching `pred`.
pub async fn wait_for<T>(stream: &mut StateStream<T>, pred: impl Fn(&Option<T>) -> bool) -> Option<T> {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match stream.next().await {
                Some(Ok(value)) if pred(&value) => return value,
                Some(_) => continue,
                None => panic!("state stream closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for matching state")
}

/// Encryptor that counts decryptions.
pub struct CountingEncryptor {
    inner: Arc<KeyService>,
    decrypts: AtomicUsize,
}

impl CountingEncryptor {
    pub fn new(inner: Arc<KeyService>) -> Self {
        Self {
            inner,
            decrypts: AtomicUsize::new(0),
        }
    }

    pub fn decrypts(&self) -> usize {
        self.decrypts.load(Ordering::SeqCst)
    }
}

impl UserEncryptor for CountingEncryptor {
    fn encrypt_bytes(&self, user_id: &UserId, plaintext: &[u8]) -> EncryptorResult<String> {
        self.inner.encrypt_bytes(user_id, plaintext)
    }

    fn decrypt_bytes(&self, user_id: &UserId, sealed: &str) -> EncryptorResult<Vec<u8>> {
        self.decrypts.fetch_add(1, Ordering::SeqCst);
        self.inner.decrypt_bytes(user_id, sealed)
    }

    fn is_available(&self, user_id: &UserId) -> bool {
        self.inner.is_available(user_id)
    }

    fn watch_available(&self, user_id: &UserId) -> watch::Receiver<bool> {
        self.inner.watch_available(user_id)
    }
}

/// Routes `tracing` output to the test harness, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
