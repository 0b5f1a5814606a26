//! Bidirectional edge invariant.
//!
//! Ensures every directed link has a matching reverse link on the same layer.
use super::{
    EvaluationMode, GraphContext, HnswInvariantViolation,
    helpers::{LayerValidator, for_each_edge},
};
use tracing::{Level, debug, trace};

pub(super) fn check_bidirectional(
    ctx: GraphContext<'_>,
    mode: &mut EvaluationMode<'_>,
) -> Result<(), HnswInvariantViolation> {
    let validator = LayerValidator::new(ctx.table);
    if tracing::enabled!(Level::TRACE) {
        let edges: usize = ctx
            .table
            .records()
            .map(|node| {
                (0..=node.level())
                    .filter_map(|layer| node.links(layer))
                    .map(|links| links.len())
                    .sum::<usize>()
            })
            .sum();
        trace!(edges, "checking bidirectional links");
    }
    for_each_edge(ctx.table, |source, target, layer| {
        match validator.ensure(source, target, layer) {
            Ok(neighbour) => {
                let reciprocal = neighbour
                    .links(layer)
                    .is_some_and(|links| links.contains(source));
                if reciprocal {
                    Ok(())
                } else {
                    debug!(source, target, layer, "missing backlink");
                    mode.record(HnswInvariantViolation::MissingBacklink {
                        origin: source,
                        target,
                        layer,
                    })
                }
            }
            Err(err) => mode.record(err),
        }
    })
}
