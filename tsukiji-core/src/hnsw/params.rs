//! Construction parameters for the HNSW index.

use std::num::NonZeroUsize;

use crate::hnsw::error::HnswError;

pub(crate) const DEFAULT_MAX_LEVEL: usize = 16;
const DEFAULT_RNG_SEED: u64 = 0x5EED_CAFE;

/// Configuration parameters for the HNSW index.
///
/// `max_connections` is the per-layer neighbour bound `M`; layer zero allows
/// twice as many links.
#[derive(Clone, Debug, PartialEq)]
pub struct HnswParams {
    max_connections: usize,
    ef_construction: usize,
    heuristic_select_neighbours: bool,
    level_multiplier: f64,
    max_level: usize,
    rng_seed: u64,
    dimensions: Option<NonZeroUsize>,
}

impl HnswParams {
    /// Creates a new parameter set with explicit neighbour and search widths.
    ///
    /// # Errors
    /// Returns [`HnswError::InvalidParameters`] when `max_connections` is zero or
    /// when `ef_construction` is smaller than `max_connections`.
    ///
    /// # Examples
    /// ```
    /// use tsukiji_core::HnswParams;
    /// let params = HnswParams::new(16, 200).expect("parameters must be valid");
    /// assert_eq!(params.max_connections(), 16);
    /// assert_eq!(params.connection_limit(0), 32);
    /// assert_eq!(params.connection_limit(3), 16);
    /// ```
    pub fn new(max_connections: usize, ef_construction: usize) -> Result<Self, HnswError> {
        if max_connections == 0 {
            return Err(HnswError::InvalidParameters {
                reason: "max_connections must be greater than zero".into(),
            });
        }
        if ef_construction < max_connections {
            return Err(HnswError::InvalidParameters {
                reason: format!(
                    "ef_construction ({ef_construction}) must be >= max_connections ({max_connections})"
                ),
            });
        }
        Ok(Self {
            max_connections,
            ef_construction,
            heuristic_select_neighbours: true,
            level_multiplier: default_level_multiplier(max_connections),
            max_level: DEFAULT_MAX_LEVEL,
            rng_seed: DEFAULT_RNG_SEED,
            dimensions: None,
        })
    }

    /// Chooses between the diversity heuristic and plain nearest-first
    /// neighbour selection.
    #[must_use]
    pub const fn with_heuristic_select_neighbours(mut self, enabled: bool) -> Self {
        self.heuristic_select_neighbours = enabled;
        self
    }

    /// Overrides the level multiplier (`1 / ln(M)` by default).
    ///
    /// # Errors
    /// Returns [`HnswError::InvalidParameters`] unless `multiplier` is finite
    /// and positive.
    pub fn with_level_multiplier(mut self, multiplier: f64) -> Result<Self, HnswError> {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(HnswError::InvalidParameters {
                reason: format!("level_multiplier must be finite and positive (got {multiplier})"),
            });
        }
        self.level_multiplier = multiplier;
        Ok(self)
    }

    /// Caps the layer assigned to new nodes.
    #[must_use]
    pub const fn with_max_level(mut self, max_level: usize) -> Self {
        self.max_level = max_level;
        self
    }

    /// Seeds the level generator to make layer assignment deterministic.
    #[must_use]
    pub const fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = seed;
        self
    }

    /// Fixes the vector dimensionality up front instead of inferring it from
    /// the first prepared vector.
    #[must_use]
    pub const fn with_dimensions(mut self, dimensions: NonZeroUsize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Returns the per-layer neighbour bound `M`.
    #[must_use]
    pub const fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Returns the construction search breadth (`ef_construction`).
    #[must_use]
    pub const fn ef_construction(&self) -> usize {
        self.ef_construction
    }

    /// Reports whether heuristic neighbour selection is enabled.
    #[must_use]
    pub const fn heuristic_select_neighbours(&self) -> bool {
        self.heuristic_select_neighbours
    }

    /// Returns the level multiplier used by the level generator.
    #[must_use]
    pub const fn level_multiplier(&self) -> f64 {
        self.level_multiplier
    }

    /// Returns the highest layer a node may be assigned.
    #[must_use]
    pub const fn max_level(&self) -> usize {
        self.max_level
    }

    /// Returns the level generator seed.
    #[must_use]
    pub const fn rng_seed(&self) -> u64 {
        self.rng_seed
    }

    /// Returns the configured dimensionality, if fixed.
    #[must_use]
    pub const fn dimensions(&self) -> Option<NonZeroUsize> {
        self.dimensions
    }

    /// Maximum number of links a node may hold at `layer`.
    #[must_use]
    pub const fn connection_limit(&self, layer: usize) -> usize {
        if layer == 0 {
            self.max_connections.saturating_mul(2)
        } else {
            self.max_connections
        }
    }
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            max_connections: 16,
            ef_construction: 200,
            heuristic_select_neighbours: true,
            level_multiplier: default_level_multiplier(16),
            max_level: DEFAULT_MAX_LEVEL,
            rng_seed: DEFAULT_RNG_SEED,
            dimensions: None,
        }
    }
}

pub(crate) fn default_level_multiplier(max_connections: usize) -> f64 {
    if max_connections < 2 {
        1.0
    } else {
        (max_connections as f64).ln().recip()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::zero_m(0, 10)]
    #[case::ef_below_m(16, 8)]
    fn new_rejects_invalid_widths(#[case] m: usize, #[case] ef: usize) {
        let err = HnswParams::new(m, ef).expect_err("parameters must be rejected");
        assert!(matches!(err, HnswError::InvalidParameters { .. }));
    }

    #[rstest]
    #[case::nan(f64::NAN)]
    #[case::zero(0.0)]
    #[case::negative(-1.0)]
    fn level_multiplier_must_be_positive(#[case] multiplier: f64) {
        let params = HnswParams::new(4, 8).expect("params");
        assert!(params.with_level_multiplier(multiplier).is_err());
    }

    #[test]
    fn defaults_match_the_stress_configuration() {
        let params = HnswParams::default();
        assert_eq!(params.max_connections(), 16);
        assert_eq!(params.ef_construction(), 200);
        assert!(params.heuristic_select_neighbours());
        assert!((params.level_multiplier() - 1.0 / 16_f64.ln()).abs() < 1e-12);
        assert_eq!(params, HnswParams::new(16, 200).expect("params"));
    }

    #[test]
    fn single_connection_uses_unit_multiplier() {
        let params = HnswParams::new(1, 1).expect("params");
        assert!((params.level_multiplier() - 1.0).abs() < f64::EPSILON);
        assert_eq!(params.connection_limit(0), 2);
    }
}
