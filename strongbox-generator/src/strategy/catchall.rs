use super::{EMAIL_CHARSET, EMAIL_RANDOM_LENGTH, GeneratorStrategy, settings_key};
use crate::error::{GeneratorResult, PolicyResult};
use crate::options::{CatchallGenerationOptions, EmailType};
use crate::policy::{DefaultPolicyEvaluator, Policy, PolicyEvaluator, PolicyType};
use crate::randomizer::Randomizer;
use async_trait::async_trait;
use std::sync::Arc;
use strongbox_state::{StateProvider, UserState};
use strongbox_types::UserId;

/// Addresses on a catch-all domain. `None` when no domain is set.
pub(crate) fn catchall(randomizer: &Randomizer, options: &CatchallGenerationOptions) -> Option<String> {
    let domain = options.catchall_domain.trim();
    if domain.is_empty() {
        return None;
    }
    let local = match options.catchall_type {
        EmailType::Random => {
            let charset: Vec<char> = EMAIL_CHARSET.chars().collect();
            randomizer.chars(EMAIL_RANDOM_LENGTH, &charset)
        }
        EmailType::WebsiteName => options.website.clone().unwrap_or_default(),
    };
    Some(format!("{local}@{domain}"))
}

pub struct CatchallGeneratorStrategy {
    provider: Arc<StateProvider>,
    randomizer: Randomizer,
}

impl CatchallGeneratorStrategy {
    pub fn new(provider: Arc<StateProvider>, randomizer: Randomizer) -> Self {
        Self {
            provider,
            randomizer,
        }
    }
}

#[async_trait]
impl GeneratorStrategy for CatchallGeneratorStrategy {
    type Options = CatchallGenerationOptions;
    type State = UserState<CatchallGenerationOptions>;

    fn durable_state(&self, user_id: &UserId) -> Self::State {
        self.provider
            .get_user(user_id, &settings_key("catchallGeneratorSettings"))
    }

    fn defaults(&self) -> Self::Options {
        CatchallGenerationOptions::default()
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
        Ok(catchall(&self.randomizer, options))
    }
}
