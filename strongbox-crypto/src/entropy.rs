//! Source of uniformly distributed random integers.

use rand::Rng;

/// Supplies uniform random integers for credential generation.
pub trait EntropySource: Send + Sync {
    /// Returns a number in `min..=max`. Returns `min` when `max <= min`.
    fn random_number(&self, min: u32, max: u32) -> u32;
}

/// Entropy backed by the operating system's CSPRNG.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn random_number(&self, min: u32, max: u32) -> u32 {
        if max <= min {
            return min;
        }
        rand::rng().random_range(min..=max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_within_inclusive_bounds() {
        let entropy = OsEntropy;
        for _ in 0..1000 {
            let n = entropy.random_number(3, 7);
            assert!((3..=7).contains(&n));
        }
    }

    #[test]
    fn collapsed_range_returns_min() {
        assert_eq!(OsEntropy.random_number(5, 5), 5);
        assert_eq!(OsEntropy.random_number(9, 2), 9);
    }
}
