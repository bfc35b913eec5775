//! Dataset Generation
//!
//! The root rank generates the dataset before distribution: uniform
//! 64-bit floats in [0, 100). A seed makes runs reproducible; without one
//! the generator is seeded from OS entropy.

use rand::SeedableRng;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;

/// Lower bound (inclusive) of generated values.
pub const VALUE_LOW: f64 = 0.0;

/// Upper bound (exclusive) of generated values.
pub const VALUE_HIGH: f64 = 100.0;

/// Generate `count` uniform values in [VALUE_LOW, VALUE_HIGH).
pub fn generate(count: u64, seed: Option<u64>) -> Vec<f64> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let between = Uniform::new(VALUE_LOW, VALUE_HIGH);
    (0..count).map(|_| between.sample(&mut rng)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_count_and_range() {
        let data = generate(1000, Some(1));
        assert_eq!(data.len(), 1000);
        assert!(data.iter().all(|&v| (VALUE_LOW..VALUE_HIGH).contains(&v)));
    }

    #[test]
    fn test_generate_is_seed_deterministic() {
        assert_eq!(generate(64, Some(42)), generate(64, Some(42)));
    }

    #[test]
    fn test_generate_seeds_differ() {
        assert_ne!(generate(64, Some(1)), generate(64, Some(2)));
    }

    #[test]
    fn test_generate_empty() {
        assert!(generate(0, Some(9)).is_empty());
    }
}
