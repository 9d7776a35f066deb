//! Generator strategies.
//!
//! A strategy bundles one credential algorithm with where its settings are
//! stored, its defaults, and the policy type that constrains it.

mod catchall;
mod eff_username;
mod forwarder;
mod passphrase;
mod password;
mod subaddress;

pub use catchall::CatchallGeneratorStrategy;
pub use eff_username::EffUsernameGeneratorStrategy;
pub use forwarder::{ForwarderState, ForwarderStrategy};
pub use passphrase::PassphraseGeneratorStrategy;
pub use password::PasswordGeneratorStrategy;
pub use subaddress::SubaddressGeneratorStrategy;

use crate::error::{GeneratorResult, PolicyResult};
use crate::policy::{Policy, PolicyEvaluator, PolicyType};
use async_trait::async_trait;
use strongbox_state::{ActiveState, ClearEvent, StateLocation, StateValue, UserKeyDefinition};
use strongbox_types::UserId;

/// Location of every generator settings key.
pub const GENERATOR_SETTINGS: StateLocation = StateLocation::new("generator");

/// Characters of the random part of generated email addresses.
pub(crate) const EMAIL_CHARSET: &str = "abcdefghijklmnopqrstuvwxyz1234567890";

/// Length of the random part of generated email addresses.
pub(crate) const EMAIL_RANDOM_LENGTH: usize = 8;

/// Settings key wiped on logout.
pub(crate) fn settings_key<T: StateValue>(key: &str) -> UserKeyDefinition<T> {
    UserKeyDefinition::new(GENERATOR_SETTINGS, key, &[ClearEvent::Logout])
}

#[async_trait]
pub trait GeneratorStrategy: Send + Sync {
    type Options: StateValue + Default;
    type State: ActiveState<Self::Options>;

    /// Where the user's settings for this generator are kept.
    fn durable_state(&self, user_id: &UserId) -> Self::State;

    /// Settings used when the user has saved none.
    fn defaults(&self) -> Self::Options;

    /// Policy type that constrains this generator, if any.
    fn policy(&self) -> Option<PolicyType>;

    /// Builds the evaluator for the policies that apply to the user.
    fn to_evaluator(
        &self,
        policies: &[Policy],
    ) -> PolicyResult<Box<dyn PolicyEvaluator<Self::Options>>>;

    /// Generates one credential. `None` means generation was skipped because
    /// a required input is missing.
    async fn generate(&self, options: &Self::Options) -> GeneratorResult<Option<String>>;
}
