use super::{GeneratorStrategy, settings_key};
use crate::error::{GeneratorError, GeneratorResult, PolicyResult};
use crate::options::PasswordGenerationOptions;
use crate::policy::{
    PasswordGeneratorOptionsEvaluator, PasswordGeneratorPolicy, Policy, PolicyEvaluator,
    PolicyType, least_privilege,
};
use crate::randomizer::Randomizer;
use async_trait::async_trait;
use std::sync::Arc;
use strongbox_state::{StateProvider, UserState};
use strongbox_types::UserId;

const LOWERCASE: &str = "abcdefghijkmnopqrstuvwxyz";
const UPPERCASE: &str = "ABCDEFGHJKLMNPQRSTUVWXYZ";
const NUMBERS: &str = "23456789";
const SPECIAL: &str = "!@#$%^&*";

/// Character class assigned to one position of the password.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    Lower,
    Upper,
    Number,
    Special,
    Any,
}

struct CharacterSets {
    lower: Vec<char>,
    upper: Vec<char>,
    number: Vec<char>,
    special: Vec<char>,
    any: Vec<char>,
}

impl CharacterSets {
    fn new(options: &PasswordGenerationOptions) -> Self {
        let mut lower: Vec<char> = LOWERCASE.chars().collect();
        let mut upper: Vec<char> = UPPERCASE.chars().collect();
        let mut number: Vec<char> = NUMBERS.chars().collect();
        let special: Vec<char> = SPECIAL.chars().collect();
        if options.ambiguous {
            lower.push('l');
            upper.extend(['I', 'O']);
            number.extend(['0', '1']);
        }

        let mut any = Vec::new();
        if options.lowercase {
            any.extend_from_slice(&lower);
        }
        if options.uppercase {
            any.extend_from_slice(&upper);
        }
        if options.number {
            any.extend_from_slice(&number);
        }
        if options.special {
            any.extend_from_slice(&special);
        }

        Self {
            lower,
            upper,
            number,
            special,
            any,
        }
    }

    fn for_slot(&self, slot: Slot) -> &[char] {
        match slot {
            Slot::Lower => &self.lower,
            Slot::Upper => &self.upper,
            Slot::Number => &self.number,
            Slot::Special => &self.special,
            Slot::Any => &self.any,
        }
    }
}

/// Generates a password from sanitized options.
///
/// Each required character gets its own slot, the remaining slots accept
/// any enabled class, and the slots are shuffled before characters are
/// drawn.
pub(crate) fn generate_password(
    randomizer: &Randomizer,
    options: &PasswordGenerationOptions,
) -> GeneratorResult<String> {
    let sets = CharacterSets::new(options);

    let mut slots = Vec::with_capacity(options.length as usize);
    let required = [
        (options.lowercase, options.min_lowercase, Slot::Lower),
        (options.uppercase, options.min_uppercase, Slot::Upper),
        (options.number, options.min_number, Slot::Number),
        (options.special, options.min_special, Slot::Special),
    ];
    for (enabled, count, slot) in required {
        if enabled {
            slots.extend(std::iter::repeat_n(slot, count as usize));
        }
    }
    while slots.len() < options.length as usize {
        slots.push(Slot::Any);
    }
    randomizer.shuffle(&mut slots);

    if slots.contains(&Slot::Any) && sets.any.is_empty() {
        return Err(GeneratorError::NoCharacterSet);
    }

    Ok(slots
        .into_iter()
        .filter_map(|slot| randomizer.pick(sets.for_slot(slot)).copied())
        .collect())
}

/// Random character passwords.
pub struct PasswordGeneratorStrategy {
    provider: Arc<StateProvider>,
    randomizer: Randomizer,
}

impl PasswordGeneratorStrategy {
    pub fn new(provider: Arc<StateProvider>, randomizer: Randomizer) -> Self {
        Self {
            provider,
            randomizer,
        }
    }
}

#[async_trait]
impl GeneratorStrategy for PasswordGeneratorStrategy {
    type Options = PasswordGenerationOptions;
    type State = UserState<PasswordGenerationOptions>;

    fn durable_state(&self, user_id: &UserId) -> Self::State {
        self.provider
            .get_user(user_id, &settings_key("passwordGeneratorSettings"))
    }

    fn defaults(&self) -> Self::Options {
        PasswordGenerationOptions::default()
    }

    fn policy(&self) -> Option<PolicyType> {
        Some(PolicyType::PasswordGenerator)
    }

    fn to_evaluator(
        &self,
        policies: &[Policy],
    ) -> PolicyResult<Box<dyn PolicyEvaluator<Self::Options>>> {
        let policy = least_privilege::<PasswordGeneratorPolicy>(policies)?;
        Ok(Box::new(PasswordGeneratorOptionsEvaluator::new(policy)))
    }

    async fn generate(&self, options: &Self::Options) -> GeneratorResult<Option<String>> {
        let options = PasswordGeneratorOptionsEvaluator::default().sanitize(options.clone());
        generate_password(&self.randomizer, &options).map(Some)
    }
}
