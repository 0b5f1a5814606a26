use super::{error::HnswError, types::DocId};

/// Placeholder document id reported for rejected search queries.
pub(crate) const QUERY_DOC: DocId = DocId::MAX;

/// Checks that `vector` is non-empty, finite, and `expected` long when the
/// index dimensionality is already known.
pub(crate) fn validate_vector(
    doc: DocId,
    vector: &[f32],
    expected: Option<usize>,
) -> Result<(), HnswError> {
    if vector.is_empty() {
        return Err(HnswError::InvalidVector {
            doc,
            reason: "vector has no components".into(),
        });
    }
    if let Some(expected) = expected.filter(|expected| *expected != vector.len()) {
        return Err(HnswError::DimensionMismatch {
            doc,
            expected,
            actual: vector.len(),
        });
    }
    if let Some((index, value)) = vector
        .iter()
        .copied()
        .enumerate()
        .find(|(_, value)| !value.is_finite())
    {
        return Err(HnswError::InvalidVector {
            doc,
            reason: format!("component {index} is not finite ({value})"),
        });
    }
    Ok(())
}
