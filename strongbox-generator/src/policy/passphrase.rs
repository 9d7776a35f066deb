use super::{Boundary, GeneratorPolicy, PolicyEvaluator, PolicyType};
use crate::options::PassphraseGenerationOptions;
use serde::{Deserialize, Serialize};

const NUM_WORDS: Boundary = Boundary::new(3, 20);

/// Effective passphrase generator policy. Shares the password generator
/// policy record; only the passphrase fields are read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PassphraseGeneratorPolicy {
    pub min_number_words: u32,
    pub capitalize: bool,
    pub include_number: bool,
}

impl GeneratorPolicy for PassphraseGeneratorPolicy {
    const POLICY_TYPE: PolicyType = PolicyType::PasswordGenerator;

    fn combine(&self, other: &Self) -> Self {
        Self {
            min_number_words: self.min_number_words.max(other.min_number_words),
            capitalize: self.capitalize || other.capitalize,
            include_number: self.include_number || other.include_number,
        }
    }
}

/// Enforces a [`PassphraseGeneratorPolicy`] on passphrase options.
#[derive(Debug, Clone)]
pub struct PassphraseGeneratorOptionsEvaluator {
    policy: PassphraseGeneratorPolicy,
    num_words: Boundary,
}

impl PassphraseGeneratorOptionsEvaluator {
    pub fn new(policy: PassphraseGeneratorPolicy) -> Self {
        let num_words = Boundary::new(
            policy.min_number_words.max(NUM_WORDS.min),
            policy.min_number_words.max(NUM_WORDS.max),
        );
        Self { policy, num_words }
    }

    pub fn policy(&self) -> &PassphraseGeneratorPolicy {
        &self.policy
    }

    pub fn num_words(&self) -> Boundary {
        self.num_words
    }
}

impl Default for PassphraseGeneratorOptionsEvaluator {
    fn default() -> Self {
        Self::new(PassphraseGeneratorPolicy::default())
    }
}

impl PolicyEvaluator<PassphraseGenerationOptions> for PassphraseGeneratorOptionsEvaluator {
    fn policy_in_effect(&self) -> bool {
        let p = &self.policy;
        p.capitalize || p.include_number || p.min_number_words > NUM_WORDS.min
    }

    fn apply_policy(&self, options: PassphraseGenerationOptions) -> PassphraseGenerationOptions {
        PassphraseGenerationOptions {
            num_words: self.num_words.fit(options.num_words),
            capitalize: options.capitalize || self.policy.capitalize,
            include_number: options.include_number || self.policy.include_number,
            ..options
        }
    }

    /// Keeps at most one separator character. An empty separator is kept.
    fn sanitize(&self, options: PassphraseGenerationOptions) -> PassphraseGenerationOptions {
        let word_separator = options.word_separator.chars().take(1).collect();
        PassphraseGenerationOptions {
            word_separator,
            ..options
        }
    }
}
