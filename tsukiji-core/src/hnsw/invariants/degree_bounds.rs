use super::{EvaluationMode, GraphContext, HnswInvariantViolation};

pub(super) fn check_degree_bounds(
    ctx: GraphContext<'_>,
    mode: &mut EvaluationMode<'_>,
) -> Result<(), HnswInvariantViolation> {
    for node in ctx.table.records() {
        for layer in 0..=node.level() {
            let limit = ctx.params.connection_limit(layer);
            let degree = node.links(layer).map_or(0, |links| links.len());
            if degree > limit {
                mode.record(HnswInvariantViolation::DegreeBounds {
                    node: node.doc(),
                    layer,
                    degree,
                    limit,
                })?;
            }
        }
    }
    Ok(())
}
