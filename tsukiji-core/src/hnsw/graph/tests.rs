//! Writer primitive tests for the graph store.

use rstest::{fixture, rstest};

use super::*;
use crate::generation::Generation;

struct Harness {
    graph: GraphStore,
    hold: HoldList<Fragment>,
}

impl Harness {
    fn node(&mut self, doc: DocId, level: usize) {
        self.graph
            .set_node(doc, level, &mut self.hold)
            .expect("node must be created");
    }

    fn link(&mut self, node: DocId, layer: usize, neighbour: DocId, distance: f32) -> LinkOutcome {
        self.graph
            .link(node, layer, neighbour, distance, &mut self.hold)
            .expect("link must succeed")
    }

    fn neighbours(&self, doc: DocId, layer: usize) -> Vec<DocId> {
        let mut ids: Vec<_> = self
            .graph
            .node(doc)
            .and_then(|node| node.links(layer))
            .map(|links| links.links().iter().map(|link| link.id).collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }
}

#[fixture]
fn harness() -> Harness {
    Harness {
        graph: GraphStore::new(2),
        hold: HoldList::new(),
    }
}

#[rstest]
fn link_is_symmetric_and_idempotent(mut harness: Harness) {
    harness.node(0, 1);
    harness.node(1, 0);
    let first = harness.link(0, 0, 1, 0.5);
    assert!(first.added);
    let second = harness.link(1, 0, 0, 0.5);
    assert!(!second.added);
    assert_eq!(harness.neighbours(0, 0), vec![1]);
    assert_eq!(harness.neighbours(1, 0), vec![0]);
}

#[rstest]
#[case::self_link(0, 0, 0)]
#[case::absent_neighbour(0, 0, 9)]
#[case::layer_above_neighbour(0, 1, 1)]
#[case::layer_above_node(1, 1, 0)]
fn link_rejects_invalid_edges(
    mut harness: Harness,
    #[case] node: DocId,
    #[case] layer: usize,
    #[case] neighbour: DocId,
) {
    harness.node(0, 1);
    harness.node(1, 0);
    let err = harness
        .graph
        .link(node, layer, neighbour, 1.0, &mut harness.hold)
        .expect_err("edge must be rejected");
    assert!(matches!(err, HnswError::GraphInvariantViolation { .. }));
}

#[rstest]
fn overflow_evicts_the_farthest_link_reciprocally(mut harness: Harness) {
    // M = 2, so layer 1 holds two links per node.
    for doc in 0..4 {
        harness.node(doc, 1);
    }
    harness.link(0, 1, 1, 0.1);
    harness.link(0, 1, 2, 0.9);
    harness.link(1, 1, 2, 0.2);
    harness.link(2, 1, 3, 0.3);
    // Node 2 is full (0, 1 plus 3 would be three): the farthest, 0, goes.
    assert_eq!(harness.neighbours(2, 1), vec![1, 3]);
    assert_eq!(harness.neighbours(0, 1), vec![1]);
}

#[rstest]
fn eviction_spares_neighbours_that_would_be_isolated(mut harness: Harness) {
    for doc in 0..4 {
        harness.node(doc, 1);
    }
    harness.link(0, 1, 1, 0.9);
    harness.link(0, 1, 2, 0.2);
    harness.link(2, 1, 3, 0.4);
    let outcome = harness.link(0, 1, 3, 0.5);
    // Node 1 only links to 0, so the next-farthest link (to 3) is dropped.
    assert_eq!(outcome.evicted, vec![(0, 3)]);
    assert_eq!(harness.neighbours(0, 1), vec![1, 2]);
    assert_eq!(harness.neighbours(3, 1), vec![2]);
}

#[rstest]
fn remove_node_detaches_every_reverse_link(mut harness: Harness) {
    for doc in 0..3 {
        harness.node(doc, 0);
    }
    harness.link(0, 0, 1, 1.0);
    harness.link(0, 0, 2, 2.0);
    harness.link(1, 0, 2, 3.0);
    let level = harness
        .graph
        .remove_node(0, &mut harness.hold)
        .expect("removal must succeed");
    assert_eq!(level, Some(0));
    assert!(!harness.graph.contains(0));
    assert_eq!(harness.graph.len(), 2);
    assert_eq!(harness.neighbours(1, 0), vec![2]);
    assert_eq!(harness.neighbours(2, 0), vec![1]);
    assert_eq!(
        harness.graph.remove_node(0, &mut harness.hold),
        Ok(None)
    );
}

#[rstest]
fn duplicate_nodes_are_rejected(mut harness: Harness) {
    harness.node(5, 0);
    let err = harness
        .graph
        .set_node(5, 2, &mut harness.hold)
        .expect_err("duplicate must fail");
    assert_eq!(err, HnswError::DuplicateNode { node: 5 });
}

#[rstest]
fn highest_node_prefers_level_then_lowest_id(mut harness: Harness) {
    assert_eq!(harness.graph.highest_node(), None);
    harness.node(4, 2);
    harness.node(1, 0);
    harness.node(9, 2);
    assert_eq!(
        harness.graph.highest_node(),
        Some(EntryPoint { doc: 4, level: 2 })
    );
}

#[rstest]
fn superseded_fragments_are_held_until_trimmed(mut harness: Harness) {
    harness.node(0, 0);
    harness.node(1, 0);
    harness.link(0, 0, 1, 1.0);
    // The initial table and both empty link arrays were superseded.
    assert_eq!(harness.hold.held_fragments(), 3);
    let before = harness.graph.memory_usage(harness.hold.held_bytes());
    harness.hold.transfer(Generation::new(0));
    let freed = harness.hold.trim(Generation::new(1));
    assert!(freed > 0);
    let after = harness.graph.memory_usage(harness.hold.held_bytes());
    assert!(after.allocated_bytes() < before.allocated_bytes());
    assert_eq!(after.on_hold_bytes(), 0);
}

#[rstest]
fn memory_usage_counts_empty_slots_as_dead(mut harness: Harness) {
    harness.node(0, 0);
    let usage = harness.graph.memory_usage(0);
    assert!(usage.dead_bytes() > 0);
    assert_eq!(
        usage.used_bytes() + usage.dead_bytes(),
        usage.allocated_bytes()
    );
}
