//! Randomness sources for reproducible simulations.
//!
//! Every random draw in a run (sensor noise, alert trigger, burst window,
//! burst size) comes from one `RandomSource` owned by the driver.

use rand::rngs::OsRng;
use rand::{Rng, SeedableRng, TryRngCore};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use crate::SimulationError;

/// Source of every random draw made by nodes.
pub trait RandomSource {
    /// Uniform draw in `[0, 1)`.
    fn next_unit(&mut self) -> f64;

    /// Uniform integer in `[min, max]`. Returns `min` when `min >= max`.
    fn range_inclusive(&mut self, min: u64, max: u64) -> u64;

    /// Draw from a normal distribution.
    fn normal(&mut self, mean: f64, std_dev: f64) -> f64;

    /// Seed that reproduces this source, if it has one.
    fn seed(&self) -> Option<u64> {
        None
    }
}

/// Deterministic random number generator for reproducible simulations.
///
/// Uses ChaCha8 algorithm for fast, high-quality pseudorandom numbers
/// with deterministic seed-based generation.
#[derive(Debug, Clone)]
pub struct DeterministicRng {
    rng: ChaCha8Rng,
    seed: u64,
}

impl DeterministicRng {
    /// Creates deterministic RNG from seed value.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Draws a fresh seed from the operating system.
    ///
    /// The seed is kept so the run can be reproduced afterwards.
    ///
    /// # Errors
    /// - `SimulationError::RandomSourceUnavailable` - OS entropy cannot be read
    pub fn from_os() -> Result<Self, SimulationError> {
        let seed = OsRng
            .try_next_u64()
            .map_err(|e| SimulationError::RandomSourceUnavailable {
                reason: e.to_string(),
            })?;
        Ok(Self::from_seed(seed))
    }
}

impl RandomSource for DeterministicRng {
    fn next_unit(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    fn range_inclusive(&mut self, min: u64, max: u64) -> u64 {
        if min >= max {
            return min;
        }
        self.rng.random_range(min..=max)
    }

    fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        match Normal::new(mean, std_dev) {
            Ok(distribution) => distribution.sample(&mut self.rng),
            Err(_) => mean,
        }
    }

    fn seed(&self) -> Option<u64> {
        Some(self.seed)
    }
}

/// Which end of a range `FixedRandom` picks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangePick {
    Min,
    Max,
}

/// Source that returns the same draws forever, for asserting exact outcomes.
#[derive(Debug, Clone)]
pub struct FixedRandom {
    unit: f64,
    range: RangePick,
    z_score: f64,
    unit_draws: u64,
}

impl FixedRandom {
    /// Unit draws never fall below any probability under 1, so random
    /// alert triggers never fire.
    pub fn never_alert() -> Self {
        Self {
            unit: 1.0 - f64::EPSILON,
            range: RangePick::Min,
            z_score: 0.0,
            unit_draws: 0,
        }
    }

    /// Unit draws are always zero, so every positive probability fires.
    pub fn always_alert() -> Self {
        Self {
            unit: 0.0,
            ..Self::never_alert()
        }
    }

    /// Picks this end of every integer range.
    pub fn with_range(mut self, range: RangePick) -> Self {
        self.range = range;
        self
    }

    /// Normal draws return `mean + z_score * std_dev`.
    pub fn with_z_score(mut self, z_score: f64) -> Self {
        self.z_score = z_score;
        self
    }

    /// Number of unit draws made so far.
    pub fn unit_draws(&self) -> u64 {
        self.unit_draws
    }
}

impl RandomSource for FixedRandom {
    fn next_unit(&mut self) -> f64 {
        self.unit_draws += 1;
        self.unit
    }

    fn range_inclusive(&mut self, min: u64, max: u64) -> u64 {
        match self.range {
            RangePick::Min => min,
            RangePick::Max => max.max(min),
        }
    }

    fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        mean + self.z_score * std_dev
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_rng_reproducibility() {
        let seed = 12345;
        let mut rng1 = DeterministicRng::from_seed(seed);
        let mut rng2 = DeterministicRng::from_seed(seed);

        let values1: Vec<u64> = (0..10).map(|_| rng1.range_inclusive(0, 100)).collect();
        let values2: Vec<u64> = (0..10).map(|_| rng2.range_inclusive(0, 100)).collect();

        assert_eq!(values1, values2);
        assert_eq!(rng1.seed(), Some(seed));
    }

    #[test]
    fn test_range_inclusive_bounds() {
        let mut rng = DeterministicRng::from_seed(7);

        for _ in 0..1_000 {
            let size = rng.range_inclusive(400, 750);
            assert!((400..=750).contains(&size));
        }
        assert_eq!(rng.range_inclusive(9, 9), 9);
        assert_eq!(rng.range_inclusive(10, 3), 10);
    }

    #[test]
    fn test_unit_draws_in_half_open_interval() {
        let mut rng = DeterministicRng::from_seed(99);
        for _ in 0..1_000 {
            let draw = rng.next_unit();
            assert!((0.0..1.0).contains(&draw));
        }
    }

    #[test]
    fn test_normal_with_zero_spread_returns_mean() {
        let mut rng = DeterministicRng::from_seed(1);
        assert_eq!(rng.normal(2.5, 0.0), 2.5);
        assert_eq!(rng.normal(2.5, f64::NAN), 2.5);
    }

    #[test]
    fn test_os_seeded_rng_reports_seed() {
        let rng = DeterministicRng::from_os().unwrap();
        let seed = rng.seed().unwrap();

        let mut replay = DeterministicRng::from_seed(seed);
        let mut original = rng.clone();
        assert_eq!(original.next_unit(), replay.next_unit());
    }

    #[test]
    fn test_fixed_random_draws() {
        let mut never = FixedRandom::never_alert();
        assert!(never.next_unit() >= 0.02);
        assert!(never.next_unit() < 1.0);
        assert_eq!(never.unit_draws(), 2);
        assert_eq!(never.range_inclusive(5, 12), 5);

        let mut always = FixedRandom::always_alert()
            .with_range(RangePick::Max)
            .with_z_score(1.5);
        assert!(always.next_unit() < 0.02);
        assert_eq!(always.range_inclusive(400, 750), 750);
        assert_eq!(always.normal(1.0, 2.0), 4.0);
        assert_eq!(always.seed(), None);
    }
}
