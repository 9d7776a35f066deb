//! Random selection primitives shared by every generator.

use crate::wordlist::WordList;
use std::sync::Arc;
use strongbox_crypto::{EntropySource, OsEntropy};

/// How [`Randomizer::pick_word`] decorates the chosen word.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WordOptions {
    pub title_case: bool,
    pub number: bool,
}

/// Uniform selection over characters, slices and word lists.
///
/// Every random decision goes through [`EntropySource::random_number`], so
/// a deterministic source makes generation reproducible in tests.
#[derive(Clone)]
pub struct Randomizer {
    entropy: Arc<dyn EntropySource>,
}

impl Randomizer {
    pub fn new(entropy: Arc<dyn EntropySource>) -> Self {
        Self { entropy }
    }

    /// Randomizer backed by the operating system CSPRNG.
    pub fn os() -> Self {
        Self::new(Arc::new(OsEntropy))
    }

    /// Uniform integer in `min..=max`.
    pub fn uniform(&self, min: u32, max: u32) -> u32 {
        self.entropy.random_number(min, max)
    }

    /// Uniform index into a collection of `len` items. `len` must be non-zero.
    fn index(&self, len: usize) -> usize {
        let max = u32::try_from(len.saturating_sub(1)).unwrap_or(u32::MAX);
        self.uniform(0, max) as usize
    }

    pub fn pick<'a, T>(&self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        items.get(self.index(items.len()))
    }

    /// Picks a word, optionally title-cased and followed by a zero-padded
    /// four digit number.
    pub fn pick_word(&self, words: &WordList, options: WordOptions) -> Option<String> {
        let mut word = self.pick(words.words())?.clone();
        if options.title_case {
            word = title_case(&word);
        }
        if options.number {
            word.push_str(&format!("{:04}", self.uniform(0, 9999)));
        }
        Some(word)
    }

    /// `length` characters drawn uniformly from `charset`.
    pub fn chars(&self, length: usize, charset: &[char]) -> String {
        (0..length).filter_map(|_| self.pick(charset)).collect()
    }

    /// Fisher-Yates shuffle in place.
    pub fn shuffle<T>(&self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let max = u32::try_from(i).unwrap_or(u32::MAX);
            let j = self.uniform(0, max) as usize;
            items.swap(i, j);
        }
    }
}

/// Uppercases the first character.
pub(crate) fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
