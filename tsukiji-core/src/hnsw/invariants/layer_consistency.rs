use super::helpers::for_each_edge;
use super::{
    EvaluationMode, GraphContext, HnswInvariantViolation, LayerConsistencyDetail,
    helpers::LayerValidator,
};

pub(super) fn check_layer_consistency(
    ctx: GraphContext<'_>,
    mode: &mut EvaluationMode<'_>,
) -> Result<(), HnswInvariantViolation> {
    let validator = LayerValidator::new(ctx.table);
    for_each_edge(ctx.table, |source, target, layer| {
        if source == target {
            return mode.record(HnswInvariantViolation::LayerConsistency {
                origin: source,
                target,
                layer,
                detail: LayerConsistencyDetail::SelfLink,
            });
        }
        match validator.ensure(source, target, layer) {
            Ok(_) => Ok(()),
            Err(err) => mode.record(err),
        }
    })
}
