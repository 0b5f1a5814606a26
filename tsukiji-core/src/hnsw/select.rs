//! Neighbour selection for freshly prepared nodes.

use crate::{distance::DistanceFunction, vectors::DocVectorAccess};

use super::{error::HnswError, types::Neighbour};

/// Keeps the `limit` nearest candidates. `candidates` must be sorted by
/// ascending distance.
pub(crate) fn select_simple(candidates: &[Neighbour], limit: usize) -> Vec<Neighbour> {
    candidates.iter().copied().take(limit).collect()
}

/// Diversity heuristic: walks candidates nearest-first and keeps one only
/// when it is closer to the query than to every neighbour kept so far.
///
/// `candidates` must be sorted by ascending distance. Candidates whose vector
/// has gone missing are dropped.
pub(crate) fn select_heuristic<V: DocVectorAccess + ?Sized>(
    candidates: &[Neighbour],
    limit: usize,
    vectors: &V,
    distance: &dyn DistanceFunction,
) -> Result<Vec<Neighbour>, HnswError> {
    let mut kept: Vec<(Neighbour, std::sync::Arc<[f32]>)> = Vec::with_capacity(limit);
    for candidate in candidates {
        if kept.len() >= limit {
            break;
        }
        let Some(vector) = vectors.get_vector(candidate.id) else {
            continue;
        };
        let mut diverse = true;
        for (_, selected) in &kept {
            if distance.distance(&vector, selected)?.value() < candidate.distance {
                diverse = false;
                break;
            }
        }
        if diverse {
            kept.push((*candidate, vector));
        }
    }
    Ok(kept.into_iter().map(|(neighbour, _)| neighbour).collect())
}
