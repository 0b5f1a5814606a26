//! Distance functions over dense `f32` vectors.
//!
//! The index talks to distances through the [`DistanceFunction`] trait so a
//! single metric is used consistently for the lifetime of an index. The free
//! functions validate their inputs and surface detailed errors.

mod cosine;
mod euclidean;
mod function;
mod helpers;
mod types;

pub use self::cosine::cosine_distance;
pub use self::euclidean::{euclidean_distance, squared_euclidean_distance};
pub use self::function::{Cosine, DistanceFunction, Euclidean, SquaredEuclidean};
pub use self::types::{Distance, DistanceError, Result, VectorKind};
