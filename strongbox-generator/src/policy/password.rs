use super::{Boundary, GeneratorPolicy, PolicyEvaluator, PolicyType};
use crate::options::PasswordGenerationOptions;
use serde::{Deserialize, Serialize};

const LENGTH: Boundary = Boundary::new(5, 128);
const MIN_DIGITS: Boundary = Boundary::new(0, 9);
const MIN_SPECIAL: Boundary = Boundary::new(0, 9);

/// Effective password generator policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordGeneratorPolicy {
    #[serde(rename = "minLength")]
    pub min_length: u32,
    #[serde(rename = "useUpper")]
    pub use_uppercase: bool,
    #[serde(rename = "useLower")]
    pub use_lowercase: bool,
    #[serde(rename = "useNumbers")]
    pub use_numbers: bool,
    #[serde(rename = "minNumbers")]
    pub number_count: u32,
    #[serde(rename = "useSpecial")]
    pub use_special: bool,
    #[serde(rename = "minSpecial")]
    pub special_count: u32,
}

impl GeneratorPolicy for PasswordGeneratorPolicy {
    const POLICY_TYPE: PolicyType = PolicyType::PasswordGenerator;

    fn combine(&self, other: &Self) -> Self {
        Self {
            min_length: self.min_length.max(other.min_length),
            use_uppercase: self.use_uppercase || other.use_uppercase,
            use_lowercase: self.use_lowercase || other.use_lowercase,
            use_numbers: self.use_numbers || other.use_numbers,
            number_count: self.number_count.max(other.number_count),
            use_special: self.use_special || other.use_special,
            special_count: self.special_count.max(other.special_count),
        }
    }
}

/// Enforces a [`PasswordGeneratorPolicy`] on password options.
#[derive(Debug, Clone)]
pub struct PasswordGeneratorOptionsEvaluator {
    policy: PasswordGeneratorPolicy,
    length: Boundary,
    min_digits: Boundary,
    min_special: Boundary,
}

impl PasswordGeneratorOptionsEvaluator {
    pub fn new(policy: PasswordGeneratorPolicy) -> Self {
        let min_digits = MIN_DIGITS.tighten(policy.number_count);
        let min_special = MIN_SPECIAL.tighten(policy.special_count);

        let requested = if policy.min_length > 0 {
            policy.min_length
        } else {
            LENGTH.min
        };
        let length_min = requested
            .max(min_digits.min + min_special.min)
            .max(LENGTH.min);
        let length = Boundary::new(length_min, LENGTH.max.max(length_min));

        Self {
            policy,
            length,
            min_digits,
            min_special,
        }
    }

    pub fn policy(&self) -> &PasswordGeneratorPolicy {
        &self.policy
    }

    pub fn length(&self) -> Boundary {
        self.length
    }

    pub fn min_digits(&self) -> Boundary {
        self.min_digits
    }

    pub fn min_special(&self) -> Boundary {
        self.min_special
    }
}

impl Default for PasswordGeneratorOptionsEvaluator {
    fn default() -> Self {
        Self::new(PasswordGeneratorPolicy::default())
    }
}

impl PolicyEvaluator<PasswordGenerationOptions> for PasswordGeneratorOptionsEvaluator {
    fn policy_in_effect(&self) -> bool {
        let p = &self.policy;
        p.use_uppercase
            || p.use_lowercase
            || p.use_numbers
            || p.use_special
            || p.min_length > LENGTH.min
            || p.number_count > MIN_DIGITS.min
            || p.special_count > MIN_SPECIAL.min
    }

    fn apply_policy(&self, options: PasswordGenerationOptions) -> PasswordGenerationOptions {
        let p = &self.policy;
        let number = p.use_numbers || p.number_count > 0 || options.number || options.min_number > 0;
        let special =
            p.use_special || p.special_count > 0 || options.special || options.min_special > 0;

        PasswordGenerationOptions {
            length: self.length.fit(options.length),
            uppercase: options.uppercase || p.use_uppercase,
            lowercase: options.lowercase || p.use_lowercase,
            number,
            min_number: self.min_digits.fit(options.min_number),
            special,
            min_special: self.min_special.fit(options.min_special),
            ..options
        }
    }

    /// A disabled class needs no characters; an enabled one needs at least
    /// one. The length then grows to fit every minimum.
    fn sanitize(&self, options: PasswordGenerationOptions) -> PasswordGenerationOptions {
        fn cascade(enabled: bool, count: u32) -> u32 {
            if enabled { count.max(1) } else { 0 }
        }

        let min_uppercase = cascade(options.uppercase, options.min_uppercase);
        let min_lowercase = cascade(options.lowercase, options.min_lowercase);
        let min_number = cascade(options.number, options.min_number);
        let min_special = cascade(options.special, options.min_special);

        let min_length = (min_uppercase + min_lowercase + min_number + min_special).max(self.length.min);
        let length = options.length.max(min_length);

        PasswordGenerationOptions {
            length,
            min_length,
            min_uppercase,
            min_lowercase,
            min_number,
            min_special,
            ..options
        }
    }
}
