//! Pluggable metric used by an index instance.

use std::fmt::Debug;

use super::{
    cosine::cosine_distance,
    euclidean::{euclidean_distance, squared_euclidean_distance},
    types::{Distance, Result},
};

/// Computes a non-negative, symmetric dissimilarity between two vectors of
/// equal dimensionality.
///
/// Implementations must be cheap to share across threads: an index calls
/// [`DistanceFunction::distance`] concurrently from every reader.
///
/// # Examples
/// ```
/// use tsukiji_core::{DistanceFunction, SquaredEuclidean};
///
/// let metric = SquaredEuclidean;
/// let d = metric.distance(&[0.0, 0.0], &[3.0, 4.0]).expect("valid vectors");
/// assert_eq!(d.value(), 25.0);
/// assert_eq!(metric.name(), "squared_euclidean");
/// ```
pub trait DistanceFunction: Send + Sync + Debug {
    /// Short identifier used in logs and summaries.
    fn name(&self) -> &'static str;

    /// Computes the distance between `left` and `right`.
    ///
    /// # Errors
    /// Returns a [`DistanceError`](crate::DistanceError) when either input is
    /// empty or non-finite, or when their lengths differ.
    fn distance(&self, left: &[f32], right: &[f32]) -> Result<Distance>;
}

/// Squared Euclidean (L2²) distance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SquaredEuclidean;

impl DistanceFunction for SquaredEuclidean {
    fn name(&self) -> &'static str {
        "squared_euclidean"
    }

    fn distance(&self, left: &[f32], right: &[f32]) -> Result<Distance> {
        squared_euclidean_distance(left, right)
    }
}

/// Euclidean (L2) distance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Euclidean;

impl DistanceFunction for Euclidean {
    fn name(&self) -> &'static str {
        "euclidean"
    }

    fn distance(&self, left: &[f32], right: &[f32]) -> Result<Distance> {
        euclidean_distance(left, right)
    }
}

/// Cosine distance, `1 - cos(θ)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cosine;

impl DistanceFunction for Cosine {
    fn name(&self) -> &'static str {
        "cosine"
    }

    fn distance(&self, left: &[f32], right: &[f32]) -> Result<Distance> {
        cosine_distance(left, right)
    }
}
