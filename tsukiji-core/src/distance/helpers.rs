//! Shared helpers for distance implementations.

use super::types::{DistanceError, Result, Vector, VectorKind};

/// Validates both inputs and ensures they share the same dimensionality.
pub(crate) fn validate_pair<'a>(
    left: &'a [f32],
    right: &'a [f32],
) -> Result<(Vector<'a>, Vector<'a>)> {
    let left = Vector::new(left, VectorKind::Left)?;
    let right = Vector::new(right, VectorKind::Right)?;
    if left.dimension() != right.dimension() {
        return Err(DistanceError::DimensionMismatch {
            left: left.dimension(),
            right: right.dimension(),
        });
    }
    Ok((left, right))
}

/// Sums squared component differences in `f64`.
pub(crate) fn sum_squared_differences(left: &Vector<'_>, right: &Vector<'_>) -> f64 {
    left.iter()
        .zip(right.iter())
        .map(|(&l, &r)| {
            let diff = f64::from(l) - f64::from(r);
            diff * diff
        })
        .sum()
}

/// Accumulates the dot product and squared magnitudes across both vectors.
pub(crate) fn accumulate_components(left: &Vector<'_>, right: &Vector<'_>) -> (f64, f64, f64) {
    let mut dot = 0.0f64;
    let mut left_squares = 0.0f64;
    let mut right_squares = 0.0f64;

    for (&l, &r) in left.iter().zip(right.iter()) {
        dot += f64::from(l) * f64::from(r);
        left_squares += f64::from(l) * f64::from(l);
        right_squares += f64::from(r) * f64::from(r);
    }

    (dot, left_squares, right_squares)
}
