//! Structural invariant checks for the HNSW graph.
//!
//! The checkers are surfaced via [`HnswIndex::invariants`] so property and
//! stress tests can assert graph health without reimplementing traversal
//! logic. Checks hold the writer lock, so they observe a quiescent graph.

mod bidirectional;
mod degree_bounds;
mod entry_point;
mod helpers;
mod layer_consistency;
mod reachability;


use std::fmt;

use thiserror::Error;

use crate::{
    hnsw::{
        HnswIndex,
        graph::NodeTable,
        params::HnswParams,
        types::{DocId, EntryPoint},
    },
    vectors::DocVectorAccess,
};

use self::{
    bidirectional::check_bidirectional, degree_bounds::check_degree_bounds,
    entry_point::check_entry_point, layer_consistency::check_layer_consistency,
    reachability::check_reachability,
};

/// Enumerates the structural invariants enforced by the HNSW graph.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HnswInvariant {
    /// Links only reference live nodes that expose the linked layer.
    LayerConsistency,
    /// No adjacency list exceeds its layer's degree bound.
    DegreeBounds,
    /// Every live node is reachable from the entry point through layer zero.
    Reachability,
    /// Every link has a matching reverse link on the same layer.
    BidirectionalLinks,
    /// The entry point exists iff the graph is populated, is live, and sits
    /// on the highest layer.
    EntryPoint,
}

impl HnswInvariant {
    /// Returns all invariants in the order they should be evaluated.
    #[must_use]
    pub const fn all() -> [Self; 5] {
        [
            Self::EntryPoint,
            Self::LayerConsistency,
            Self::DegreeBounds,
            Self::BidirectionalLinks,
            Self::Reachability,
        ]
    }

    /// Every invariant except [`Reachability`](Self::Reachability), which
    /// removals may legitimately break because neighbours are not repaired.
    #[must_use]
    pub const fn structural() -> [Self; 4] {
        [
            Self::EntryPoint,
            Self::LayerConsistency,
            Self::DegreeBounds,
            Self::BidirectionalLinks,
        ]
    }
}

/// Reason describing why a layer-consistency check failed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LayerConsistencyDetail {
    /// The referenced node is not in the graph.
    MissingNode,
    /// The referenced node exists but exposes fewer layers than required.
    MissingLayer {
        /// Number of layers the target exposes.
        available: usize,
    },
    /// The node links to itself.
    SelfLink,
}

impl fmt::Display for LayerConsistencyDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingNode => f.write_str("target node is missing"),
            Self::MissingLayer { available } => {
                write!(f, "target node exposes only {available} layer(s)")
            }
            Self::SelfLink => f.write_str("the link points back at its origin"),
        }
    }
}

/// Reports an invariant violation surfaced by [`HnswInvariantChecker`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum HnswInvariantViolation {
    /// A node references a neighbour at a layer the neighbour does not expose.
    #[error("node {origin} references {target} at layer {layer}, but {detail}")]
    LayerConsistency {
        /// Node that emitted the invalid reference.
        origin: DocId,
        /// Referenced neighbour identifier.
        target: DocId,
        /// Layer index of the reference.
        layer: usize,
        /// Detailed failure reason.
        detail: LayerConsistencyDetail,
    },
    /// A node exceeded the configured degree bound for a specific layer.
    #[error("node {node} has {degree} connection(s) on layer {layer}, exceeding limit {limit}")]
    DegreeBounds {
        /// Node whose adjacency exceeded the allowed bound.
        node: DocId,
        /// Layer containing the overflow.
        layer: usize,
        /// Actual neighbouring nodes counted.
        degree: usize,
        /// Maximum permitted neighbours for the layer.
        limit: usize,
    },
    /// Reported when a populated graph lacks an entry point.
    #[error("graph entry point missing despite populated nodes")]
    MissingEntryPoint,
    /// The entry point is set although the graph is empty.
    #[error("graph is empty but entry point {node} is set")]
    UnexpectedEntryPoint {
        /// Recorded entry node.
        node: DocId,
    },
    /// The entry point references a node that is not live.
    #[error("entry point {node} is not in the graph")]
    StaleEntryPoint {
        /// Recorded entry node.
        node: DocId,
    },
    /// The recorded entry level differs from the entry node's level.
    #[error("entry point {node} is recorded at level {recorded} but has level {actual}")]
    EntryLevelMismatch {
        /// Entry node.
        node: DocId,
        /// Level stored alongside the entry point.
        recorded: usize,
        /// Level of the node itself.
        actual: usize,
    },
    /// Another node sits above the entry point.
    #[error("node {node} has level {level}, above entry point {entry} at level {entry_level}")]
    EntryNotHighest {
        /// Entry node.
        entry: DocId,
        /// Level of the entry node.
        entry_level: usize,
        /// Node above the entry point.
        node: DocId,
        /// Level of that node.
        level: usize,
    },
    /// A node cannot be reached from the entry point through layer zero.
    #[error("node {node} is unreachable from the entry point")]
    UnreachableNode {
        /// Identifier of the unreachable node.
        node: DocId,
    },
    /// A directed edge is missing its counterpart at the same layer.
    #[error("edge {origin}->{target} at layer {layer} is missing the reverse link")]
    MissingBacklink {
        /// Source node that exposes the one-way edge.
        origin: DocId,
        /// Target node lacking the reverse edge.
        target: DocId,
        /// Layer index containing the asymmetric edge.
        layer: usize,
    },
    /// The writer lock was poisoned, so no quiescent snapshot was available.
    #[error("index writer lock poisoned")]
    WriterUnavailable,
}

/// Helper returned by [`HnswIndex::invariants`] to run structural checks.
#[derive(Debug)]
pub struct HnswInvariantChecker<'index, V> {
    index: &'index HnswIndex<V>,
}

impl<'index, V: DocVectorAccess> HnswInvariantChecker<'index, V> {
    pub(in crate::hnsw) fn new(index: &'index HnswIndex<V>) -> Self {
        Self { index }
    }

    /// Runs all invariants, returning the first violation encountered.
    ///
    /// # Errors
    /// Returns the first [`HnswInvariantViolation`] found.
    pub fn check_all(&self) -> Result<(), HnswInvariantViolation> {
        self.check_many(HnswInvariant::all())
    }

    /// Runs a custom subset of invariants in the provided order.
    ///
    /// # Errors
    /// Returns the first [`HnswInvariantViolation`] found.
    pub fn check_many(
        &self,
        invariants: impl IntoIterator<Item = HnswInvariant>,
    ) -> Result<(), HnswInvariantViolation> {
        self.run_with_mode(invariants, EvaluationMode::FailFast)
    }

    /// Runs a single invariant.
    ///
    /// # Errors
    /// Returns the first [`HnswInvariantViolation`] found.
    pub fn check(&self, invariant: HnswInvariant) -> Result<(), HnswInvariantViolation> {
        self.check_many([invariant])
    }

    /// Executes every invariant and returns the full set of violations.
    #[must_use]
    pub fn collect_all(&self) -> Vec<HnswInvariantViolation> {
        self.collect_many(HnswInvariant::all())
    }

    /// Executes the selected invariants and returns every violation discovered.
    #[must_use]
    pub fn collect_many(
        &self,
        invariants: impl IntoIterator<Item = HnswInvariant>,
    ) -> Vec<HnswInvariantViolation> {
        let mut violations = Vec::new();
        if let Err(err) = self.run_with_mode(invariants, EvaluationMode::Collect(&mut violations)) {
            violations.push(err);
        }
        violations
    }

    fn run_with_mode(
        &self,
        invariants: impl IntoIterator<Item = HnswInvariant>,
        mut mode: EvaluationMode<'_>,
    ) -> Result<(), HnswInvariantViolation> {
        let _writer = self
            .index
            .lock_writer()
            .map_err(|_| HnswInvariantViolation::WriterUnavailable)?;
        let table = self.index.graph().snapshot();
        let ctx = GraphContext {
            table: &table,
            entry: self.index.graph().entry_point(),
            params: self.index.params(),
        };
        for invariant in invariants {
            dispatch(ctx, invariant, &mut mode)?;
        }
        Ok(())
    }
}

fn dispatch(
    ctx: GraphContext<'_>,
    invariant: HnswInvariant,
    mode: &mut EvaluationMode<'_>,
) -> Result<(), HnswInvariantViolation> {
    match invariant {
        HnswInvariant::LayerConsistency => check_layer_consistency(ctx, mode),
        HnswInvariant::DegreeBounds => check_degree_bounds(ctx, mode),
        HnswInvariant::Reachability => check_reachability(ctx, mode),
        HnswInvariant::BidirectionalLinks => check_bidirectional(ctx, mode),
        HnswInvariant::EntryPoint => check_entry_point(ctx, mode),
    }
}

#[derive(Clone, Copy)]
pub(super) struct GraphContext<'a> {
    table: &'a NodeTable,
    entry: Option<EntryPoint>,
    params: &'a HnswParams,
}

pub(super) enum EvaluationMode<'a> {
    FailFast,
    Collect(&'a mut Vec<HnswInvariantViolation>),
}

impl EvaluationMode<'_> {
    fn record(&mut self, violation: HnswInvariantViolation) -> Result<(), HnswInvariantViolation> {
        match self {
            Self::FailFast => Err(violation),
            Self::Collect(sink) => {
                sink.push(violation);
                Ok(())
            }
        }
    }
}
