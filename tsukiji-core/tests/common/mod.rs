use rand::{Rng, SeedableRng, rngs::SmallRng};

/// Uniform vectors in `[-1, 1)^dimensions`, reproducible from `seed`.
#[must_use]
pub fn random_vectors(count: usize, dimensions: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..count)
        .map(|_| (0..dimensions).map(|_| rng.gen_range(-1.0..1.0)).collect())
        .collect()
}
