//! Policy-aware front end over one generator strategy.

use crate::error::GeneratorResult;
use crate::policy::{PolicyEvaluator, PolicySource};
use crate::strategy::GeneratorStrategy;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use strongbox_state::ActiveState;
use strongbox_types::UserId;

/// Loads and saves a user's settings and enforces the policies that apply
/// to them.
///
/// One settings state is kept per user for the life of the service, so
/// background work the state owns (such as a forwarder's migration buffer)
/// outlives a single call.
pub struct GeneratorService<S: GeneratorStrategy> {
    strategy: S,
    policies: Arc<dyn PolicySource>,
    states: Mutex<HashMap<UserId, Arc<S::State>>>,
}

impl<S: GeneratorStrategy> GeneratorService<S> {
    pub fn new(strategy: S, policies: Arc<dyn PolicySource>) -> Self {
        Self {
            strategy,
            policies,
            states: Mutex::new(HashMap::new()),
        }
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// The user's settings state, shared by every call on this service.
    pub fn settings(&self, user_id: &UserId) -> Arc<S::State> {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        let state = states
            .entry(user_id.clone())
            .or_insert_with(|| Arc::new(self.strategy.durable_state(user_id)));
        Arc::clone(state)
    }

    /// Saved settings, or the strategy defaults when none are saved.
    pub async fn options(&self, user_id: &UserId) -> GeneratorResult<S::Options> {
        let saved = self.settings(user_id).state().current().await?;
        Ok(saved.unwrap_or_else(|| self.strategy.defaults()))
    }

    pub async fn save_options(&self, user_id: &UserId, options: S::Options) -> GeneratorResult<()> {
        self.settings(user_id)
            .update(move |_| Some(options))
            .await?;
        Ok(())
    }

    /// Evaluator for the policies currently applying to the user.
    pub fn evaluator(&self, user_id: &UserId) -> GeneratorResult<Box<dyn PolicyEvaluator<S::Options>>> {
        let policies = match self.strategy.policy() {
            Some(policy_type) => self.policies.policies(user_id, policy_type),
            None => Vec::new(),
        };
        Ok(self.strategy.to_evaluator(&policies)?)
    }

    /// Applies the user's policies to `options`, then repairs whatever the
    /// policy made inconsistent.
    pub fn enforce_policy(&self, user_id: &UserId, options: S::Options) -> GeneratorResult<S::Options> {
        let evaluator = self.evaluator(user_id)?;
        Ok(evaluator.sanitize(evaluator.apply_policy(options)))
    }

    pub async fn generate(&self, options: &S::Options) -> GeneratorResult<Option<String>> {
        self.strategy.generate(options).await
    }
}
