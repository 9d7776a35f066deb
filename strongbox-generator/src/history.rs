//! Encrypted per-user history of generated credentials.
//!
//! Each entry is encrypted on its own through the array layout of
//! [`SecretState`]; only the category and generation date are stored in
//! plaintext. Password history from older clients can be imported through a
//! buffer that migrates into the encrypted store once the user's key is
//! available.

use crate::error::GeneratorResult;
use crate::strategy::GENERATOR_SETTINGS;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use strongbox_crypto::UserEncryptor;
use strongbox_state::{
    ActiveState, ArrayLayout, BufferedKeyDefinition, BufferedState, ClearEvent, SecretClassifier,
    SecretKeyDefinition, SecretKeyOptions, SecretState, StateProvider, StateStream, UpdateOptions,
};
use strongbox_types::UserId;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialCategory {
    Password,
    Username,
    Email,
}

/// One entry of the generation history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedCredential {
    pub credential: String,
    pub category: CredentialCategory,
    pub generation_date: DateTime<Utc>,
}

impl GeneratedCredential {
    pub fn new(
        credential: impl Into<String>,
        category: CredentialCategory,
        generation_date: DateTime<Utc>,
    ) -> Self {
        Self {
            credential: credential.into(),
            category,
            generation_date,
        }
    }
}

/// Password history entry as older clients stored it. `date` is in
/// milliseconds since the Unix epoch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyPasswordHistory {
    pub password: String,
    pub date: i64,
}

impl LegacyPasswordHistory {
    fn into_credential(self) -> GeneratedCredential {
        let date = DateTime::from_timestamp_millis(self.date).unwrap_or(DateTime::UNIX_EPOCH);
        GeneratedCredential::new(self.password, CredentialCategory::Password, date)
    }
}

type HistoryState = BufferedState<
    Vec<LegacyPasswordHistory>,
    Vec<GeneratedCredential>,
    bool,
    SecretState<ArrayLayout<GeneratedCredential>>,
>;

fn history_key() -> SecretKeyDefinition<ArrayLayout<GeneratedCredential>> {
    SecretKeyDefinition::array(
        GENERATOR_SETTINGS,
        "localGeneratorHistory",
        SecretClassifier::all_secret()
            .disclose("category")
            .disclose("generationDate"),
        SecretKeyOptions {
            clear_on: vec![ClearEvent::Logout],
            ..SecretKeyOptions::default()
        },
    )
}

fn legacy_buffer_key(
    max_history: usize,
) -> BufferedKeyDefinition<Vec<LegacyPasswordHistory>, Vec<GeneratedCredential>, bool> {
    BufferedKeyDefinition::new(GENERATOR_SETTINGS, "localGeneratorHistoryBuffer")
        .with_clear_on(&[ClearEvent::Logout])
        .with_is_valid(|legacy: &Vec<LegacyPasswordHistory>, _| !legacy.is_empty())
        .with_map(move |legacy: Vec<LegacyPasswordHistory>, _| {
            let mut history: Vec<GeneratedCredential> = legacy
                .into_iter()
                .map(LegacyPasswordHistory::into_credential)
                .collect();
            history.sort_by(|a, b| b.generation_date.cmp(&a.generation_date));
            history.truncate(max_history);
            history
        })
}

/// Per-user generation history, newest entry first.
pub struct GeneratorHistoryService {
    provider: Arc<StateProvider>,
    encryptor: Arc<dyn UserEncryptor>,
    max_history: usize,
    states: Mutex<HashMap<UserId, Arc<HistoryState>>>,
}

impl GeneratorHistoryService {
    pub fn new(
        provider: Arc<StateProvider>,
        encryptor: Arc<dyn UserEncryptor>,
        max_history: usize,
    ) -> Self {
        Self {
            provider,
            encryptor,
            max_history,
            states: Mutex::new(HashMap::new()),
        }
    }

    fn state(&self, user_id: &UserId) -> Arc<HistoryState> {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        let state = states.entry(user_id.clone()).or_insert_with(|| {
            let encrypted = SecretState::from(
                user_id,
                history_key(),
                &self.provider,
                Arc::clone(&self.encryptor),
            );
            Arc::new(BufferedState::with_dependency(
                &self.provider,
                legacy_buffer_key(self.max_history),
                encrypted,
                self.encryptor.watch_available(user_id),
            ))
        });
        Arc::clone(state)
    }

    /// Records a credential. Returns the new entry, or `None` when it
    /// repeats the newest entry and was not recorded.
    pub async fn track(
        &self,
        user_id: &UserId,
        credential: &str,
        category: CredentialCategory,
        date: DateTime<Utc>,
    ) -> GeneratorResult<Option<GeneratedCredential>> {
        let entry = GeneratedCredential::new(credential, category, date);
        let max_history = self.max_history;
        let repeated = credential.to_string();
        let inserted = entry.clone();

        let stored = self
            .state(user_id)
            .update_with(
                move |current, _: Option<&()>| {
                    let mut history = current.unwrap_or_default();
                    history.insert(0, inserted);
                    history.truncate(max_history);
                    Some(history)
                },
                UpdateOptions::new().should_update(move |current: Option<&Vec<GeneratedCredential>>, _| {
                    current
                        .and_then(|history| history.first())
                        .is_none_or(|newest| newest.credential != repeated)
                }),
            )
            .await?;

        let tracked = stored.and_then(|history| history.into_iter().next()) == Some(entry.clone());
        if tracked {
            debug!("tracked {:?} credential for user {}", category, user_id);
        }
        Ok(tracked.then_some(entry))
    }

    /// Removes the newest entry matching `credential` and returns it.
    pub async fn take(
        &self,
        user_id: &UserId,
        credential: &str,
    ) -> GeneratorResult<Option<GeneratedCredential>> {
        let wanted = credential.to_string();
        let taken = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&taken);
        let present = wanted.clone();

        self.state(user_id)
            .update_with(
                move |current, _: Option<&()>| {
                    let mut history = current.unwrap_or_default();
                    if let Some(index) = history.iter().position(|c| c.credential == wanted) {
                        *slot.lock().unwrap_or_else(PoisonError::into_inner) =
                            Some(history.remove(index));
                    }
                    Some(history)
                },
                UpdateOptions::new().should_update(move |current: Option<&Vec<GeneratedCredential>>, _| {
                    current.is_some_and(|history| history.iter().any(|c| c.credential == present))
                }),
            )
            .await?;

        let taken = taken.lock().unwrap_or_else(PoisonError::into_inner).take();
        Ok(taken)
    }

    /// Deletes the whole history and returns what was deleted.
    pub async fn clear(&self, user_id: &UserId) -> GeneratorResult<Vec<GeneratedCredential>> {
        let cleared = Arc::new(Mutex::new(Vec::new()));
        let slot = Arc::clone(&cleared);

        self.state(user_id)
            .update(move |current| {
                *slot.lock().unwrap_or_else(PoisonError::into_inner) = current.unwrap_or_default();
                None
            })
            .await?;

        let cleared = std::mem::take(&mut *cleared.lock().unwrap_or_else(PoisonError::into_inner));
        Ok(cleared)
    }

    /// Live view of the history.
    pub fn credentials(&self, user_id: &UserId) -> StateStream<Vec<GeneratedCredential>> {
        self.state(user_id).state()
    }

    /// Current history, newest first.
    pub async fn history(&self, user_id: &UserId) -> GeneratorResult<Vec<GeneratedCredential>> {
        let state = self.state(user_id);
        state.rollover_now().await?;
        Ok(state.output().get().await?.unwrap_or_default())
    }

    /// Stages plaintext history from an older client. It replaces the
    /// encrypted history once the user's key is available; entries tracked
    /// after that are kept on top of it.
    pub async fn import_legacy(
        &self,
        user_id: &UserId,
        legacy: Vec<LegacyPasswordHistory>,
    ) -> GeneratorResult<()> {
        self.state(user_id).buffer(Some(legacy)).await?;
        Ok(())
    }
}
