use super::{GENERATOR_SETTINGS, GeneratorStrategy};
use crate::error::{GeneratorResult, PolicyResult};
use crate::forwarders::ForwarderClient;
use crate::options::ForwarderSettings;
use crate::policy::{DefaultPolicyEvaluator, Policy, PolicyEvaluator, PolicyType};
use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;
use strongbox_crypto::UserEncryptor;
use strongbox_state::{
    BufferedKeyDefinition, BufferedState, ClearEvent, SecretKeyDefinition, SecretKeyOptions,
    SecretState, StateProvider, ValueLayout,
};
use strongbox_types::UserId;

/// Encrypted forwarder settings fronted by a plaintext migration buffer.
pub type ForwarderState<S> = BufferedState<S, S, bool, SecretState<ValueLayout<S>>>;

/// Forwarding addresses from an email forwarding service.
///
/// Settings hold an API token, so they are stored encrypted. Settings that
/// arrive before the user's key is available wait in a buffer and are
/// rolled over once it is; buffered settings without a token are dropped.
pub struct ForwarderStrategy<S> {
    provider: Arc<StateProvider>,
    encryptor: Arc<dyn UserEncryptor>,
    client: ForwarderClient,
    _settings: PhantomData<fn() -> S>,
}

impl<S: ForwarderSettings> ForwarderStrategy<S> {
    pub fn new(
        provider: Arc<StateProvider>,
        encryptor: Arc<dyn UserEncryptor>,
        client: ForwarderClient,
    ) -> Self {
        Self {
            provider,
            encryptor,
            client,
            _settings: PhantomData,
        }
    }

    pub fn key(&self) -> SecretKeyDefinition<ValueLayout<S>> {
        SecretKeyDefinition::value(
            GENERATOR_SETTINGS,
            format!("{}Forwarder", S::FORWARDER.id()),
            S::classifier(),
            SecretKeyOptions {
                clear_on: vec![ClearEvent::Logout],
                ..SecretKeyOptions::default()
            },
        )
    }

    pub fn buffer_key(&self) -> BufferedKeyDefinition<S> {
        BufferedKeyDefinition::new(GENERATOR_SETTINGS, format!("{}Buffer", S::FORWARDER.id()))
            .with_clear_on(&[ClearEvent::Logout])
            .with_is_valid(|settings: &S, _| !settings.token().trim().is_empty())
    }
}

#[async_trait]
impl<S: ForwarderSettings> GeneratorStrategy for ForwarderStrategy<S> {
    type Options = S;
    type State = ForwarderState<S>;

    fn durable_state(&self, user_id: &UserId) -> Self::State {
        let encrypted = SecretState::from(user_id, self.key(), &self.provider, Arc::clone(&self.encryptor));
        BufferedState::with_dependency(
            &self.provider,
            self.buffer_key(),
            encrypted,
            self.encryptor.watch_available(user_id),
        )
    }

    fn defaults(&self) -> Self::Options {
        S::default()
    }

    fn policy(&self) -> Option<PolicyType> {
        None
    }

    fn to_evaluator(
        &self,
        _policies: &[Policy],
    ) -> PolicyResult<Box<dyn PolicyEvaluator<Self::Options>>> {
        Ok(Box::new(DefaultPolicyEvaluator))
    }

    async fn generate(&self, options: &Self::Options) -> GeneratorResult<Option<String>> {
        let address = self.client.generate(&options.clone().into_options()).await?;
        Ok(Some(address))
    }
}
