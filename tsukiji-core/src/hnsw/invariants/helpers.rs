use std::sync::Arc;

use crate::hnsw::{
    graph::NodeTable,
    node::NodeRecord,
    types::DocId,
};

use super::{HnswInvariantViolation, LayerConsistencyDetail};

/// Calls `visitor(source, target, layer)` for every directed link.
pub(super) fn for_each_edge(
    table: &NodeTable,
    mut visitor: impl FnMut(DocId, DocId, usize) -> Result<(), HnswInvariantViolation>,
) -> Result<(), HnswInvariantViolation> {
    for node in table.records() {
        for layer in 0..=node.level() {
            let Some(links) = node.links(layer) else {
                continue;
            };
            for link in links.links() {
                visitor(node.doc(), link.id, layer)?;
            }
        }
    }
    Ok(())
}

#[derive(Clone, Copy, Debug)]
pub(super) struct LayerValidator<'a> {
    table: &'a NodeTable,
}

impl<'a> LayerValidator<'a> {
    pub(super) fn new(table: &'a NodeTable) -> Self {
        Self { table }
    }

    /// Resolves `target` as seen from `origin` at `layer`.
    pub(super) fn ensure(
        &self,
        origin: DocId,
        target: DocId,
        layer: usize,
    ) -> Result<Arc<NodeRecord>, HnswInvariantViolation> {
        let violation = |detail| HnswInvariantViolation::LayerConsistency {
            origin,
            target,
            layer,
            detail,
        };
        let node = self
            .table
            .get(target)
            .ok_or_else(|| violation(LayerConsistencyDetail::MissingNode))?;
        if !node.has_layer(layer) {
            return Err(violation(LayerConsistencyDetail::MissingLayer {
                available: node.level() + 1,
            }));
        }
        Ok(node)
    }
}
