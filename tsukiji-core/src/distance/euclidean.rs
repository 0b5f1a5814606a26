use crate::distance::helpers::{sum_squared_differences, validate_pair};
use crate::distance::types::{Distance, Result};

/// Computes the squared Euclidean distance between two vectors.
///
/// This is the metric HNSW graphs are usually built with: it orders
/// neighbours exactly like [`euclidean_distance`] without the square root.
///
/// # Examples
///
/// ```
/// use tsukiji_core::{DistanceError, squared_euclidean_distance};
///
/// fn main() -> Result<(), DistanceError> {
///     let distance = squared_euclidean_distance(&[1.0, 2.0], &[4.0, 6.0])?;
///     assert!((distance.value() - 25.0).abs() < 1e-6);
///     Ok(())
/// }
/// ```
///
/// # Errors
///
/// - [`DistanceError::ZeroLength`](crate::DistanceError::ZeroLength) when any input is empty.
/// - [`DistanceError::DimensionMismatch`](crate::DistanceError::DimensionMismatch) when input
///   lengths differ.
/// - [`DistanceError::NonFinite`](crate::DistanceError::NonFinite) when a value is NaN or
///   infinite.
pub fn squared_euclidean_distance(left: &[f32], right: &[f32]) -> Result<Distance> {
    let (left, right) = validate_pair(left, right)?;
    Ok(Distance::from_raw(
        sum_squared_differences(&left, &right) as f32,
    ))
}

/// Computes the Euclidean distance between two vectors.
///
/// # Examples
///
/// ```
/// use tsukiji_core::{DistanceError, euclidean_distance};
///
/// fn main() -> Result<(), DistanceError> {
///     let distance = euclidean_distance(&[1.0, 2.0, 3.0], &[4.0, 6.0, 8.0])?;
///     assert!((distance.value() - 7.071_068).abs() < 1e-6);
///     Ok(())
/// }
/// ```
///
/// # Errors
///
/// Same as [`squared_euclidean_distance`].
pub fn euclidean_distance(left: &[f32], right: &[f32]) -> Result<Distance> {
    let (left, right) = validate_pair(left, right)?;
    Ok(Distance::from_raw(
        sum_squared_differences(&left, &right).sqrt() as f32,
    ))
}
