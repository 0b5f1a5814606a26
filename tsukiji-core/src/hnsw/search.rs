//! Layer search routines over a node-table snapshot.
//!
//! Implements greedy descent and best-first per-layer search. Nodes that
//! disappeared from the snapshot, lack the searched layer, or have no vector
//! are skipped: readers race with the writer and tolerate stale links.

use std::collections::{BinaryHeap, HashSet};

use crate::{distance::DistanceFunction, vectors::DocVectorAccess};

use super::{
    error::HnswError,
    graph::NodeTable,
    types::{DocId, Neighbour, ReverseNeighbour},
};

#[derive(Debug, Default)]
struct SearchState {
    visited: HashSet<DocId>,
    candidates: BinaryHeap<ReverseNeighbour>,
    best: BinaryHeap<Neighbour>,
}

impl SearchState {
    fn seed(&mut self, entry: Neighbour, ef: usize) {
        if self.visited.insert(entry.id) {
            self.try_enqueue(entry, ef);
        }
    }

    fn pop_candidate(&mut self) -> Option<Neighbour> {
        self.candidates.pop().map(|candidate| candidate.inner)
    }

    fn furthest_is_closer_than(&self, ef: usize, distance: f32) -> bool {
        self.best.len() >= ef
            && self
                .best
                .peek()
                .is_some_and(|furthest| distance > furthest.distance)
    }

    fn visit(&mut self, candidate: DocId) -> bool {
        self.visited.insert(candidate)
    }

    fn try_enqueue(&mut self, candidate: Neighbour, ef: usize) {
        if self.furthest_is_closer_than(ef, candidate.distance) {
            return;
        }
        self.candidates
            .push(ReverseNeighbour::new(candidate.id, candidate.distance));
        self.best.push(candidate);
        while self.best.len() > ef {
            self.best.pop();
        }
    }

    fn finalise(self) -> Vec<Neighbour> {
        self.best.into_sorted_vec()
    }
}

/// Read-only searcher bound to one query and one table snapshot.
pub(crate) struct LayerSearcher<'a, V: ?Sized> {
    table: &'a NodeTable,
    vectors: &'a V,
    distance: &'a dyn DistanceFunction,
    query: &'a [f32],
}

impl<'a, V: DocVectorAccess + ?Sized> LayerSearcher<'a, V> {
    pub(crate) fn new(
        table: &'a NodeTable,
        vectors: &'a V,
        distance: &'a dyn DistanceFunction,
        query: &'a [f32],
    ) -> Self {
        Self {
            table,
            vectors,
            distance,
            query,
        }
    }

    /// Distance from the query to `doc`, or `None` when `doc` has no vector.
    pub(crate) fn distance_to(&self, doc: DocId) -> Result<Option<f32>, HnswError> {
        let Some(vector) = self.vectors.get_vector(doc) else {
            return Ok(None);
        };
        let distance = self.distance.distance(self.query, &vector)?;
        Ok(Some(distance.value()))
    }

    /// Scores `doc` as a search entry, skipping it when absent or vectorless.
    pub(crate) fn entry(&self, doc: DocId) -> Result<Option<Neighbour>, HnswError> {
        if self.table.get(doc).is_none() {
            return Ok(None);
        }
        Ok(self
            .distance_to(doc)?
            .map(|distance| Neighbour { id: doc, distance }))
    }

    /// Follows strictly closer neighbours at `layer` until none remain.
    pub(crate) fn greedy_search_layer(
        &self,
        entry: Neighbour,
        layer: usize,
    ) -> Result<Neighbour, HnswError> {
        let mut current = entry;
        loop {
            let Some(links) = self.table.get(current.id).and_then(|node| node.links(layer)) else {
                return Ok(current);
            };
            let mut improved = None;
            for link in links.links() {
                let Some(distance) = self.live_distance(link.id, layer)? else {
                    continue;
                };
                let best = improved.map_or(current.distance, |found: Neighbour| found.distance);
                if distance < best {
                    improved = Some(Neighbour {
                        id: link.id,
                        distance,
                    });
                }
            }
            match improved {
                Some(next) => current = next,
                None => return Ok(current),
            }
        }
    }

    /// Best-first search at `layer` returning up to `ef` nearest nodes in
    /// ascending distance.
    pub(crate) fn search_layer(
        &self,
        entries: &[Neighbour],
        layer: usize,
        ef: usize,
    ) -> Result<Vec<Neighbour>, HnswError> {
        let ef = ef.max(1);
        let mut state = SearchState::default();
        for entry in entries {
            state.seed(*entry, ef);
        }
        while let Some(candidate) = state.pop_candidate() {
            if state.furthest_is_closer_than(ef, candidate.distance) {
                break;
            }
            let Some(links) = self
                .table
                .get(candidate.id)
                .and_then(|node| node.links(layer))
            else {
                continue;
            };
            for link in links.links() {
                if !state.visit(link.id) {
                    continue;
                }
                if let Some(distance) = self.live_distance(link.id, layer)? {
                    state.try_enqueue(
                        Neighbour {
                            id: link.id,
                            distance,
                        },
                        ef,
                    );
                }
            }
        }
        Ok(state.finalise())
    }

    fn live_distance(&self, doc: DocId, layer: usize) -> Result<Option<f32>, HnswError> {
        let present = self
            .table
            .get(doc)
            .is_some_and(|node| node.has_layer(layer));
        if present {
            self.distance_to(doc)
        } else {
            Ok(None)
        }
    }
}
