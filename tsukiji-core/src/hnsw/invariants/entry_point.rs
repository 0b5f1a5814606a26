use super::{EvaluationMode, GraphContext, HnswInvariantViolation};

pub(super) fn check_entry_point(
    ctx: GraphContext<'_>,
    mode: &mut EvaluationMode<'_>,
) -> Result<(), HnswInvariantViolation> {
    let populated = ctx.table.records().next().is_some();
    let entry = match (ctx.entry, populated) {
        (None, false) => return Ok(()),
        (None, true) => return mode.record(HnswInvariantViolation::MissingEntryPoint),
        (Some(entry), false) => {
            return mode.record(HnswInvariantViolation::UnexpectedEntryPoint { node: entry.doc });
        }
        (Some(entry), true) => entry,
    };
    let Some(node) = ctx.table.get(entry.doc) else {
        return mode.record(HnswInvariantViolation::StaleEntryPoint { node: entry.doc });
    };
    if node.level() != entry.level {
        mode.record(HnswInvariantViolation::EntryLevelMismatch {
            node: entry.doc,
            recorded: entry.level,
            actual: node.level(),
        })?;
    }
    if let Some(higher) = ctx
        .table
        .records()
        .find(|candidate| candidate.level() > node.level())
    {
        mode.record(HnswInvariantViolation::EntryNotHighest {
            entry: entry.doc,
            entry_level: node.level(),
            node: higher.doc(),
            level: higher.level(),
        })?;
    }
    Ok(())
}
