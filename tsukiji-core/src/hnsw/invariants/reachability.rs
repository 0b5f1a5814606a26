//! Reachability invariant: every live node is reachable from the entry point
//! by breadth-first traversal of layer zero.
use std::collections::{HashSet, VecDeque};

use super::{EvaluationMode, GraphContext, HnswInvariantViolation};

pub(super) fn check_reachability(
    ctx: GraphContext<'_>,
    mode: &mut EvaluationMode<'_>,
) -> Result<(), HnswInvariantViolation> {
    if ctx.table.records().next().is_none() {
        return Ok(());
    }
    let Some(entry) = ctx.entry.filter(|entry| ctx.table.get(entry.doc).is_some()) else {
        return mode.record(HnswInvariantViolation::MissingEntryPoint);
    };

    let mut visited = HashSet::from([entry.doc]);
    let mut queue = VecDeque::from([entry.doc]);
    while let Some(current) = queue.pop_front() {
        let Some(links) = ctx.table.get(current).and_then(|node| node.links(0)) else {
            continue;
        };
        for link in links.links() {
            if ctx.table.get(link.id).is_some() && visited.insert(link.id) {
                queue.push_back(link.id);
            }
        }
    }

    for node in ctx.table.records() {
        if !visited.contains(&node.doc()) {
            mode.record(HnswInvariantViolation::UnreachableNode { node: node.doc() })?;
        }
    }
    Ok(())
}
