//! Word lists for passphrases and word usernames.

use crate::error::{GeneratorError, GeneratorResult};
use std::path::Path;
use std::sync::Arc;

/// Immutable, cheaply cloned list of words.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WordList {
    words: Arc<[String]>,
}

impl WordList {
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses one word per line. EFF dice lists (`11111\tabacus`) are
    /// accepted as well; blank lines and `#` comments are skipped.
    pub fn parse(text: &str) -> GeneratorResult<Self> {
        let words: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| match line.split_once(char::is_whitespace) {
                Some((dice, word)) if dice.chars().all(|c| c.is_ascii_digit()) => word.trim(),
                _ => line,
            })
            .map(str::to_string)
            .collect();

        if words.is_empty() {
            return Err(GeneratorError::EmptyWordList);
        }
        Ok(Self::from_words(words))
    }

    pub fn load(path: impl AsRef<Path>) -> GeneratorResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| GeneratorError::Config(format!("{}: {e}", path.display())))?;
        Self::parse(&text)
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.iter().any(|w| w == word)
    }
}
