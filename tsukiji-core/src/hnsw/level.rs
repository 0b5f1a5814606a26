//! Random layer assignment for new nodes.

use std::fmt::Debug;
use std::sync::{Mutex, PoisonError};

use rand::{Rng, SeedableRng, rngs::SmallRng};
use rayon::{current_num_threads, current_thread_index};

use crate::hnsw::params::{DEFAULT_MAX_LEVEL, HnswParams, default_level_multiplier};

/// SplitMix64 increment (the 64-bit golden ratio) used for per-worker seed
/// derivation.
const WORKER_SEED_SPACING: u64 = 0x9E37_79B9_7F4A_7C15;
const SPLITMIX_MULT_A: u64 = 0xBF58_476D_1CE4_E5B9;
const SPLITMIX_MULT_B: u64 = 0x94D0_49BB_1331_11EB;

/// Draws the maximum layer for a node about to be inserted.
///
/// Called concurrently from prepare workers, so implementations must be
/// thread-safe.
pub trait LevelGenerator: Send + Sync + Debug {
    /// Returns a layer `>= 0` drawn independently of previous draws.
    fn next_level(&self) -> usize;
}

/// Inverse-logarithmic level distribution: `P(level >= l) = M^-l` for the
/// default multiplier `1 / ln(M)`.
///
/// Each rayon worker draws from its own seeded RNG so prepare threads do not
/// contend; other threads share a fallback RNG. A single thread drawing from
/// a fixed seed always observes the same sequence.
///
/// # Examples
/// ```
/// use tsukiji_core::{HnswParams, InvLogLevelGenerator, LevelGenerator};
///
/// let params = HnswParams::new(16, 200).expect("params").with_rng_seed(7);
/// let levels = InvLogLevelGenerator::from_params(&params);
/// assert!(levels.next_level() <= params.max_level());
/// ```
#[derive(Debug)]
pub struct InvLogLevelGenerator {
    multiplier: f64,
    max_level: usize,
    fallback: Mutex<SmallRng>,
    workers: Box<[Mutex<SmallRng>]>,
}

impl InvLogLevelGenerator {
    /// Builds a generator for fan-out `max_connections` with the default level
    /// cap, seeded with `seed`.
    #[must_use]
    pub fn new(max_connections: usize, seed: u64) -> Self {
        Self::build(
            default_level_multiplier(max_connections),
            DEFAULT_MAX_LEVEL,
            seed,
            current_num_threads(),
        )
    }

    /// Builds a generator from the multiplier, cap, and seed in `params`.
    #[must_use]
    pub fn from_params(params: &HnswParams) -> Self {
        Self::with_worker_slots(params, current_num_threads())
    }

    /// Builds a generator with `slots` per-worker RNGs; worker indices beyond
    /// `slots` use the shared fallback RNG.
    #[must_use]
    pub fn with_worker_slots(params: &HnswParams, slots: usize) -> Self {
        Self::build(
            params.level_multiplier(),
            params.max_level(),
            params.rng_seed(),
            slots,
        )
    }

    fn build(multiplier: f64, max_level: usize, seed: u64, slots: usize) -> Self {
        Self {
            multiplier,
            max_level,
            fallback: Mutex::new(SmallRng::seed_from_u64(seed)),
            workers: (0..slots)
                .map(|index| Mutex::new(SmallRng::seed_from_u64(mix_worker_seed(seed, index))))
                .collect(),
        }
    }

    fn level_from_draw(&self, draw: f64) -> usize {
        // `draw` is in [0, 1); `1 - draw` keeps the logarithm finite.
        let scaled = -(1.0 - draw).ln() * self.multiplier;
        (scaled.floor() as usize).min(self.max_level)
    }

    fn draw(rng: &Mutex<SmallRng>) -> f64 {
        // An RNG left mid-update by a panicking thread is still a valid RNG.
        rng.lock().unwrap_or_else(PoisonError::into_inner).r#gen::<f64>()
    }
}

impl LevelGenerator for InvLogLevelGenerator {
    fn next_level(&self) -> usize {
        let rng = current_thread_index()
            .and_then(|index| self.workers.get(index))
            .unwrap_or(&self.fallback);
        self.level_from_draw(Self::draw(rng))
    }
}

#[inline]
fn mix_worker_seed(base_seed: u64, worker_index: usize) -> u64 {
    splitmix64(base_seed ^ ((worker_index as u64 + 1).wrapping_mul(WORKER_SEED_SPACING)))
}

#[inline]
fn splitmix64(mut state: u64) -> u64 {
    state = state.wrapping_add(WORKER_SEED_SPACING);
    state = (state ^ (state >> 30)).wrapping_mul(SPLITMIX_MULT_A);
    state = (state ^ (state >> 27)).wrapping_mul(SPLITMIX_MULT_B);
    state ^ (state >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn generator(m: usize, seed: u64) -> InvLogLevelGenerator {
        let params = HnswParams::new(m, m.max(8))
            .expect("params")
            .with_rng_seed(seed);
        InvLogLevelGenerator::with_worker_slots(&params, 0)
    }

    #[rstest]
    #[case::zero_draw(0.0, 0)]
    #[case::half(0.5, 0)]
    #[case::past_one_over_m(0.95, 1)]
    #[case::capped(1.0 - 1e-15, 12)]
    fn draws_map_to_inverse_log_levels(#[case] draw: f64, #[case] expected: usize) {
        let levels = generator(16, 1);
        assert_eq!(levels.level_from_draw(draw), expected);
    }

    #[test]
    fn same_seed_reproduces_sequence_on_one_thread() {
        let a = generator(16, 42);
        let b = generator(16, 42);
        let left: Vec<_> = (0..256).map(|_| a.next_level()).collect();
        let right: Vec<_> = (0..256).map(|_| b.next_level()).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn level_frequencies_decay_with_fan_out() {
        let levels = generator(4, 9);
        let draws = 20_000;
        let upper = (0..draws).filter(|_| levels.next_level() >= 1).count();
        // Expected share is 1/M = 25%.
        let share = upper as f64 / f64::from(draws);
        assert!((0.2..0.3).contains(&share), "unexpected share {share}");
    }

    #[test]
    fn worker_seeds_differ_per_index() {
        let seeds: std::collections::HashSet<_> =
            (0..8).map(|index| mix_worker_seed(7, index)).collect();
        assert_eq!(seeds.len(), 8);
    }
}
