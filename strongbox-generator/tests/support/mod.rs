//! Shared helpers for generator integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use strongbox_crypto::{EntropySource, KeyService, generate_random_key};
use strongbox_generator::{Randomizer, WordList};
use strongbox_state::storage::MemoryStorage;
use strongbox_state::{StateProvider, StateResult, StateStream};
use strongbox_types::UserId;
use tracing_subscriber::EnvFilter;

/// Always answers the lower bound.
pub struct MinEntropy;

impl EntropySource for MinEntropy {
    fn random_number(&self, min: u32, _max: u32) -> u32 {
        min
    }
}

/// Always answers the upper bound.
pub struct MaxEntropy;

impl EntropySource for MaxEntropy {
    fn random_number(&self, min: u32, max: u32) -> u32 {
        max.max(min)
    }
}

pub fn min_randomizer() -> Randomizer {
    Randomizer::new(Arc::new(MinEntropy))
}

pub fn max_randomizer() -> Randomizer {
    Randomizer::new(Arc::new(MaxEntropy))
}

pub fn words() -> WordList {
    WordList::from_words(["alpha", "bravo", "charlie", "delta", "echo", "foxtrot"])
}

pub fn memory_provider() -> (Arc<StateProvider>, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let provider = Arc::new(StateProvider::new(storage.clone()));
    (provider, storage)
}

/// Key service with `user` unlocked.
pub fn unlocked(user: &UserId) -> Arc<KeyService> {
    let keys = Arc::new(KeyService::new());
    keys.set_user_key(user, generate_random_key());
    keys
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

pub async fn next<T>(stream: &mut StateStream<T>) -> StateResult<Option<T>> {
    tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .expect("timed out waiting for state")
        .expect("state stream closed")
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
