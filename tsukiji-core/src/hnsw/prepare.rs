//! Output of the read-only prepare phase.

use std::sync::Arc;

use crate::generation::{Generation, Guard};

use super::types::{DocId, Neighbour};

/// Candidate neighbours computed for one document by
/// [`HnswIndex::prepare_add`](super::HnswIndex::prepare_add).
///
/// Carries the guard taken before the graph was read; completion must happen
/// while it is alive so every candidate is still safe to inspect.
#[derive(Clone, Debug)]
pub struct PrepareResult {
    pub(crate) doc: DocId,
    pub(crate) level: usize,
    pub(crate) layers: Vec<Vec<Neighbour>>,
    pub(crate) vector: Arc<[f32]>,
    pub(crate) guard: Guard,
}

impl PrepareResult {
    /// Document being inserted.
    #[must_use]
    #[rustfmt::skip]
    pub fn doc(&self) -> DocId { self.doc }

    /// Top layer drawn for the new node.
    #[must_use]
    #[rustfmt::skip]
    pub fn level(&self) -> usize { self.level }

    /// Selected candidates for `layer`, nearest first. Empty for layers the
    /// search did not reach.
    #[must_use]
    pub fn candidates(&self, layer: usize) -> &[Neighbour] {
        self.layers.get(layer).map_or(&[], Vec::as_slice)
    }

    /// Number of layers that received candidates; zero when the graph was
    /// empty at prepare time.
    #[must_use]
    #[rustfmt::skip]
    pub fn searched_layers(&self) -> usize { self.layers.len() }

    /// Vector the candidates were computed for.
    #[must_use]
    #[rustfmt::skip]
    pub fn vector(&self) -> &[f32] { &self.vector }

    /// Generation pinned while the graph was read.
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.guard.generation()
    }

    /// Guard kept alive until completion.
    #[must_use]
    #[rustfmt::skip]
    pub fn guard(&self) -> &Guard { &self.guard }
}
