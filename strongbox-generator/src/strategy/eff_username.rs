use super::{GeneratorStrategy, settings_key};
use crate::error::{GeneratorError, GeneratorResult, PolicyResult};
use crate::options::EffUsernameGenerationOptions;
use crate::policy::{DefaultPolicyEvaluator, Policy, PolicyEvaluator, PolicyType};
use crate::randomizer::{Randomizer, WordOptions};
use crate::wordlist::WordList;
use async_trait::async_trait;
use std::sync::Arc;
use strongbox_state::{StateProvider, UserState};
use strongbox_types::UserId;

/// Usernames made of one word from the EFF list.
pub struct EffUsernameGeneratorStrategy {
    provider: Arc<StateProvider>,
    randomizer: Randomizer,
    words: WordList,
}

impl EffUsernameGeneratorStrategy {
    pub fn new(provider: Arc<StateProvider>, randomizer: Randomizer, words: WordList) -> Self {
        Self {
            provider,
            randomizer,
            words,
        }
    }
}

#[async_trait]
impl GeneratorStrategy for EffUsernameGeneratorStrategy {
    type Options = EffUsernameGenerationOptions;
    type State = UserState<EffUsernameGenerationOptions>;

    fn durable_state(&self, user_id: &UserId) -> Self::State {
        self.provider
            .get_user(user_id, &settings_key("effUsernameGeneratorSettings"))
    }

    fn defaults(&self) -> Self::Options {
        EffUsernameGenerationOptions::default()
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
        let decoration = WordOptions {
            title_case: options.word_capitalize,
            number: options.word_include_number,
        };
        self.randomizer
            .pick_word(&self.words, decoration)
            .map(Some)
            .ok_or(GeneratorError::EmptyWordList)
    }
}
