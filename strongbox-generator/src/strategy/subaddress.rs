use super::{EMAIL_CHARSET, EMAIL_RANDOM_LENGTH, GeneratorStrategy, settings_key};
use crate::error::{GeneratorResult, PolicyResult};
use crate::options::{EmailType, SubaddressGenerationOptions};
use crate::policy::{DefaultPolicyEvaluator, Policy, PolicyEvaluator, PolicyType};
use crate::randomizer::Randomizer;
use async_trait::async_trait;
use std::sync::Arc;
use strongbox_state::{StateProvider, UserState};
use strongbox_types::UserId;

/// Inserts a `+tag` into an address. Addresses without an `@`, or whose
/// `@` is first or last, come back unchanged.
pub(crate) fn subaddress(randomizer: &Randomizer, options: &SubaddressGenerationOptions) -> String {
    let email = &options.subaddress_email;
    let length = email.chars().count();
    let at_index = email.chars().position(|c| c == '@');
    let Some(at_index) = at_index.filter(|&i| i >= 1 && i < length - 1) else {
        return email.clone();
    };

    let split = email
        .char_indices()
        .nth(at_index)
        .map(|(byte, _)| byte)
        .unwrap_or_default();
    let (local, domain) = (&email[..split], &email[split + 1..]);

    let tag = match options.subaddress_type {
        EmailType::Random => {
            let charset: Vec<char> = EMAIL_CHARSET.chars().collect();
            randomizer.chars(EMAIL_RANDOM_LENGTH, &charset)
        }
        EmailType::WebsiteName => options.website.clone().unwrap_or_default(),
    };
    format!("{local}+{tag}@{domain}")
}

/// Plus-addressed variants of the user's email address.
pub struct SubaddressGeneratorStrategy {
    provider: Arc<StateProvider>,
    randomizer: Randomizer,
}

impl SubaddressGeneratorStrategy {
    pub fn new(provider: Arc<StateProvider>, randomizer: Randomizer) -> Self {
        Self {
            provider,
            randomizer,
        }
    }
}

#[async_trait]
impl GeneratorStrategy for SubaddressGeneratorStrategy {
    type Options = SubaddressGenerationOptions;
    type State = UserState<SubaddressGenerationOptions>;

    fn durable_state(&self, user_id: &UserId) -> Self::State {
        self.provider
            .get_user(user_id, &settings_key("subaddressGeneratorSettings"))
    }

    fn defaults(&self) -> Self::Options {
        SubaddressGenerationOptions::default()
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
        Ok(Some(subaddress(&self.randomizer, options)))
    }
}
