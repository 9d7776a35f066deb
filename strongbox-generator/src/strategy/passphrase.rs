use super::{GeneratorStrategy, settings_key};
use crate::error::{GeneratorError, GeneratorResult, PolicyResult};
use crate::options::PassphraseGenerationOptions;
use crate::policy::{
    PassphraseGeneratorOptionsEvaluator, PassphraseGeneratorPolicy, Policy, PolicyEvaluator,
    PolicyType, least_privilege,
};
use crate::randomizer::{Randomizer, WordOptions};
use crate::wordlist::WordList;
use async_trait::async_trait;
use std::sync::Arc;
use strongbox_state::{StateProvider, UserState};
use strongbox_types::UserId;

/// Generates a passphrase from sanitized options.
pub(crate) fn generate_passphrase(
    randomizer: &Randomizer,
    words: &WordList,
    options: &PassphraseGenerationOptions,
) -> GeneratorResult<String> {
    let num_words = if options.num_words <= 2 {
        PassphraseGenerationOptions::default().num_words
    } else {
        options.num_words
    };
    let decoration = WordOptions {
        title_case: options.capitalize,
        number: false,
    };

    let mut chosen = (0..num_words)
        .map(|_| randomizer.pick_word(words, decoration))
        .collect::<Option<Vec<String>>>()
        .ok_or(GeneratorError::EmptyWordList)?;

    if options.include_number {
        let max = u32::try_from(chosen.len() - 1).unwrap_or(u32::MAX);
        let index = randomizer.uniform(0, max) as usize;
        let digit = randomizer.uniform(0, 9);
        if let Some(word) = chosen.get_mut(index) {
            word.push_str(&digit.to_string());
        }
    }

    Ok(chosen.join(&options.word_separator))
}

/// Word-based passphrases.
pub struct PassphraseGeneratorStrategy {
    provider: Arc<StateProvider>,
    randomizer: Randomizer,
    words: WordList,
}

impl PassphraseGeneratorStrategy {
    pub fn new(provider: Arc<StateProvider>, randomizer: Randomizer, words: WordList) -> Self {
        Self {
            provider,
            randomizer,
            words,
        }
    }
}

#[async_trait]
impl GeneratorStrategy for PassphraseGeneratorStrategy {
    type Options = PassphraseGenerationOptions;
    type State = UserState<PassphraseGenerationOptions>;

    fn durable_state(&self, user_id: &UserId) -> Self::State {
        self.provider
            .get_user(user_id, &settings_key("passphraseGeneratorSettings"))
    }

    fn defaults(&self) -> Self::Options {
        PassphraseGenerationOptions::default()
    }

    fn policy(&self) -> Option<PolicyType> {
        Some(PolicyType::PasswordGenerator)
    }

    fn to_evaluator(
        &self,
        policies: &[Policy],
    ) -> PolicyResult<Box<dyn PolicyEvaluator<Self::Options>>> {
        let policy = least_privilege::<PassphraseGeneratorPolicy>(policies)?;
        Ok(Box::new(PassphraseGeneratorOptionsEvaluator::new(policy)))
    }

    async fn generate(&self, options: &Self::Options) -> GeneratorResult<Option<String>> {
        let options = PassphraseGeneratorOptionsEvaluator::default().sanitize(options.clone());
        generate_passphrase(&self.randomizer, &self.words, &options).map(Some)
    }
}
