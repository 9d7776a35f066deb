mod support;

use pretty_assertions::assert_eq;
use std::sync::Arc;
use strongbox_state::storage::{SqliteStorage, StorageBackend};
use strongbox_state::*;
use strongbox_types::UserId;
use support::*;
use tokio::sync::watch;

fn counter_key() -> UserKeyDefinition<u32> {
    UserKeyDefinition::new(TEST_LOCATION, "counter", &[ClearEvent::Logout])
}

// --- Reads and updates ---

#[tokio::test]
async fn missing_value_reads_as_none() {
    let (provider, _) = memory_provider();
    let state = provider.get_user(&UserId::new(), &counter_key());
    let mut stream = state.state();
    assert_eq!(next(&mut stream).await.unwrap(), None);
}

#[tokio::test]
async fn update_is_visible_to_subscribers() {
    let (provider, _) = memory_provider();
    let state = provider.get_user(&UserId::new(), &counter_key());
    let mut stream = state.state();
    assert_eq!(next(&mut stream).await.unwrap(), None);

    let stored = state.update(|n| Some(n.unwrap_or(0) + 1)).await.unwrap();
    assert_eq!(stored, Some(1));
    assert_eq!(next(&mut stream).await.unwrap(), Some(1));
}

#[tokio::test]
async fn existing_backend_value_is_emitted_first() {
    let storage = Arc::new(storage::MemoryStorage::new());
    let user = UserId::new();
    storage
        .set(&user, &counter_key().storage_key(), Some(&serde_json::json!(41)))
        .await
        .unwrap();
    let provider = Arc::new(StateProvider::new(storage));

    let mut stream = provider.get_user(&user, &counter_key()).state();
    assert_eq!(next(&mut stream).await.unwrap(), Some(41));
}

#[tokio::test]
async fn concurrent_updates_are_serialized() {
    let (provider, _) = memory_provider();
    let state = provider.get_user(&UserId::new(), &counter_key());

    let mut handles = Vec::new();
    for _ in 0..20 {
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            state.update(|n| Some(n.unwrap_or(0) + 1)).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(state.get().await.unwrap(), Some(20));
}

#[tokio::test]
async fn should_update_veto_keeps_current_value() {
    let (provider, storage) = memory_provider();
    let user = UserId::new();
    let state = provider.get_user(&user, &counter_key());
    state.update(|_| Some(5)).await.unwrap();

    let result = state
        .update_with(
            |_, _: Option<&()>| Some(99),
            UpdateOptions::new().should_update(|current: Option<&u32>, _| current != Some(&5)),
        )
        .await
        .unwrap();

    assert_eq!(result, Some(5));
    assert_eq!(
        storage.raw(&user, &counter_key().storage_key()),
        Some(serde_json::json!(5))
    );
}

#[tokio::test]
async fn combine_latest_with_passes_latest_value() {
    let (provider, _) = memory_provider();
    let state = provider.get_user(&UserId::new(), &counter_key());
    let (tx, rx) = watch::channel(10u32);
    tx.send_replace(32);

    let result = state
        .update_with(
            |current, extra: Option<&u32>| Some(current.unwrap_or(0) + extra.copied().unwrap_or(0)),
            UpdateOptions::new().combine_latest_with(rx),
        )
        .await
        .unwrap();
    assert_eq!(result, Some(32));
}

#[tokio::test]
async fn writing_none_removes_the_entry() {
    let (provider, storage) = memory_provider();
    let user = UserId::new();
    let state = provider.get_user(&user, &counter_key());
    state.update(|_| Some(1)).await.unwrap();
    state.update(|_| None).await.unwrap();
    assert!(storage.raw(&user, &counter_key().storage_key()).is_none());
}

#[tokio::test]
async fn custom_deserializer_upgrades_stored_shape() {
    let (provider, _) = memory_provider();
    let user = UserId::new();
    let legacy = UserKeyDefinition::<String>::new(TEST_LOCATION, "counter", &[]);
    provider
        .set_user_state(&user, &legacy, Some("7".to_string()))
        .await
        .unwrap();

    let upgraded = UserKeyDefinition::<u32>::new(TEST_LOCATION, "counter", &[]).with_deserializer(
        |value| match value {
            serde_json::Value::String(s) => s
                .parse()
                .map_err(|e: std::num::ParseIntError| StateError::Serialization(e.to_string())),
            other => Ok(serde_json::from_value(other)?),
        },
    );
    assert_eq!(provider.get_user(&user, &upgraded).get().await.unwrap(), Some(7));
}

// --- Lifecycle ---

#[tokio::test]
async fn logout_clears_only_keys_registered_for_logout() {
    let (provider, storage) = memory_provider();
    let user = UserId::new();
    let keep = UserKeyDefinition::<u32>::new(TEST_LOCATION, "keep", &[ClearEvent::Lock]);

    provider.get_user(&user, &counter_key()).update(|_| Some(1)).await.unwrap();
    provider.get_user(&user, &keep).update(|_| Some(2)).await.unwrap();

    let cleared = provider.clear(&user, ClearEvent::Logout).await.unwrap();
    assert_eq!(cleared, 1);
    assert!(storage.raw(&user, &counter_key().storage_key()).is_none());
    assert!(storage.raw(&user, &keep.storage_key()).is_some());
}

#[tokio::test]
async fn clear_notifies_subscribers() {
    let (provider, _) = memory_provider();
    let user = UserId::new();
    let state = provider.get_user(&user, &counter_key());
    state.update(|_| Some(3)).await.unwrap();

    let mut stream = state.state();
    assert_eq!(next(&mut stream).await.unwrap(), Some(3));
    provider.clear(&user, ClearEvent::Logout).await.unwrap();
    assert_eq!(next(&mut stream).await.unwrap(), None);
}

#[tokio::test]
async fn users_are_isolated() {
    let (provider, _) = memory_provider();
    let alice = UserId::from("alice");
    let bob = UserId::from("bob");
    provider.get_user(&alice, &counter_key()).update(|_| Some(1)).await.unwrap();

    assert_eq!(provider.get_user(&bob, &counter_key()).get().await.unwrap(), None);
    provider.clear(&bob, ClearEvent::Logout).await.unwrap();
    assert_eq!(provider.get_user(&alice, &counter_key()).get().await.unwrap(), Some(1));
}

#[tokio::test]
async fn evict_keeps_slots_with_subscribers() {
    let (provider, _) = memory_provider();
    let user = UserId::new();
    let watched = provider.get_user(&user, &counter_key());
    let idle = provider.get_user(&user, &UserKeyDefinition::<u32>::new(TEST_LOCATION, "idle", &[]));

    let mut stream = watched.state();
    idle.update(|_| Some(1)).await.unwrap();
    next(&mut stream).await.unwrap();

    assert_eq!(provider.evict(&user), 1);
    assert_eq!(idle.get().await.unwrap(), Some(1));
}

// --- SQLite backend ---

#[tokio::test]
async fn sqlite_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = StateConfig {
        database_path: Some(dir.path().join("state.db")),
        ..StateConfig::default()
    };
    let user = UserId::new();

    {
        let provider = Arc::new(StateProvider::open(&config).unwrap());
        provider.get_user(&user, &counter_key()).update(|_| Some(9)).await.unwrap();
    }

    let provider = Arc::new(StateProvider::open(&config).unwrap());
    assert_eq!(provider.get_user(&user, &counter_key()).get().await.unwrap(), Some(9));
}

#[tokio::test]
async fn sqlite_set_none_deletes_row() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let user = UserId::new();
    let key = counter_key().storage_key();

    storage.set(&user, &key, Some(&serde_json::json!({"a": 1}))).await.unwrap();
    assert_eq!(storage.get(&user, &key).await.unwrap(), Some(serde_json::json!({"a": 1})));

    storage.set(&user, &key, None).await.unwrap();
    assert_eq!(storage.get(&user, &key).await.unwrap(), None);
}

#[test]
fn storage_key_display_joins_location_and_key() {
    assert_eq!(counter_key().storage_key().to_string(), "test_counter");
}
