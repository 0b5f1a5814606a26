//! Graph store: node table, adjacency, entry point, and writer primitives.
//!
//! Readers load the table and node records through `arc-swap` and never
//! block. Every mutation goes through the writer primitives below, which
//! require the writer's [`HoldList`]: superseded link arrays, removed node
//! records, and outgrown tables are parked there instead of being dropped.

mod table;

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use arc_swap::ArcSwap;
use tracing::{debug, trace};

use crate::{
    generation::{HoldList, Reclaimable},
    hnsw::{
        error::HnswError,
        node::{LinkArray, NodeRecord},
        types::{DocId, EntryCell, EntryPoint, Neighbour},
    },
    memory::MemoryUsage,
    telemetry,
};

pub(crate) use self::table::NodeTable;

/// Graph fragment superseded by the writer.
#[derive(Debug)]
pub(crate) enum Fragment {
    Links(Arc<LinkArray>),
    Node(Arc<NodeRecord>),
    Table(Arc<NodeTable>),
}

impl Reclaimable for Fragment {
    fn reclaimable_bytes(&self) -> usize {
        match self {
            Self::Links(links) => links.heap_bytes(),
            Self::Node(node) => node.total_bytes(),
            Self::Table(table) => table.heap_bytes(),
        }
    }
}

/// Result of a [`GraphStore::link`] call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct LinkOutcome {
    /// Whether the pair was newly linked.
    pub(crate) added: bool,
    /// Links `(node, neighbour)` dropped to restore the degree bound.
    pub(crate) evicted: Vec<(DocId, DocId)>,
}

#[derive(Debug)]
pub(crate) struct GraphStore {
    table: ArcSwap<NodeTable>,
    entry: EntryCell,
    max_connections: usize,
    nodes: AtomicUsize,
    record_bytes: AtomicUsize,
}

impl GraphStore {
    pub(crate) fn new(max_connections: usize) -> Self {
        Self {
            table: ArcSwap::from_pointee(NodeTable::with_slots(0)),
            entry: EntryCell::empty(),
            max_connections,
            nodes: AtomicUsize::new(0),
            record_bytes: AtomicUsize::new(0),
        }
    }

    /// Degree bound at `layer`.
    pub(crate) fn connection_limit(&self, layer: usize) -> usize {
        if layer == 0 {
            self.max_connections.saturating_mul(2)
        } else {
            self.max_connections
        }
    }

    /// Current table; stays valid for as long as the caller keeps it.
    pub(crate) fn snapshot(&self) -> Arc<NodeTable> {
        self.table.load_full()
    }

    pub(crate) fn node(&self, doc: DocId) -> Option<Arc<NodeRecord>> {
        self.table.load().get(doc)
    }

    pub(crate) fn contains(&self, doc: DocId) -> bool {
        self.node(doc).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.load(Ordering::Acquire)
    }

    pub(crate) fn entry_point(&self) -> Option<EntryPoint> {
        self.entry.load()
    }

    /// Installs `entry` (or clears it) as the search root.
    pub(crate) fn update_entry_point(&self, entry: Option<EntryPoint>) {
        debug!(
            doc = entry.map(|point| point.doc),
            level = entry.map(|point| point.level),
            "entry point updated"
        );
        self.entry.store(entry);
    }

    /// Node with the greatest level, lowest id on ties; `None` when empty.
    pub(crate) fn highest_node(&self) -> Option<EntryPoint> {
        self.snapshot()
            .records()
            .map(|node| EntryPoint {
                doc: node.doc(),
                level: node.level(),
            })
            .reduce(|best, candidate| {
                if candidate.level > best.level {
                    candidate
                } else {
                    best
                }
            })
    }

    /// Creates `doc` with layers `0..=level` and no links.
    pub(crate) fn set_node(
        &self,
        doc: DocId,
        level: usize,
        hold: &mut HoldList<Fragment>,
    ) -> Result<Arc<NodeRecord>, HnswError> {
        let table = self.table_fitting(doc, hold);
        let slot = table.slot(doc).ok_or_else(|| HnswError::GraphInvariantViolation {
            message: format!("node table has no slot for document {doc}"),
        })?;
        if slot.load().is_some() {
            return Err(HnswError::DuplicateNode { node: doc });
        }
        let record = Arc::new(NodeRecord::new(doc, level));
        self.record_bytes
            .fetch_add(record.total_bytes(), Ordering::AcqRel);
        slot.store(Some(Arc::clone(&record)));
        self.nodes.fetch_add(1, Ordering::AcqRel);
        trace!(doc, level, "node created");
        Ok(record)
    }

    /// Detaches every link of `doc`, clears its slot, and parks the record.
    ///
    /// Returns the removed node's level, or `None` when `doc` is absent.
    pub(crate) fn remove_node(
        &self,
        doc: DocId,
        hold: &mut HoldList<Fragment>,
    ) -> Result<Option<usize>, HnswError> {
        let table = self.snapshot();
        let Some(record) = table.get(doc) else {
            return Ok(None);
        };
        for layer in 0..=record.level() {
            let links = record.links(layer).unwrap_or_default();
            for link in links.links() {
                self.unlink(doc, layer, link.id, hold)?;
            }
        }
        if let Some(slot) = table.slot(doc) {
            slot.store(None);
        }
        self.nodes.fetch_sub(1, Ordering::AcqRel);
        self.record_bytes
            .fetch_sub(record.total_bytes(), Ordering::AcqRel);
        let level = record.level();
        hold.hold(Fragment::Node(record));
        trace!(doc, level, "node removed");
        Ok(Some(level))
    }

    /// Links `node` and `neighbour` at `layer` in both directions, then
    /// restores the degree bound on both ends by evicting their farthest
    /// links.
    ///
    /// Linking an already linked pair changes nothing.
    ///
    /// # Errors
    /// Returns [`HnswError::GraphInvariantViolation`] for self-links, absent
    /// nodes, or a layer above either node's level.
    pub(crate) fn link(
        &self,
        node: DocId,
        layer: usize,
        neighbour: DocId,
        distance: f32,
        hold: &mut HoldList<Fragment>,
    ) -> Result<LinkOutcome, HnswError> {
        if node == neighbour {
            return Err(HnswError::GraphInvariantViolation {
                message: format!("node {node} cannot link to itself at layer {layer}"),
            });
        }
        let source = self.layer_record(node, layer)?;
        let target = self.layer_record(neighbour, layer)?;
        let source_links = source.links(layer).unwrap_or_default();
        if source_links.contains(neighbour) {
            return Ok(LinkOutcome::default());
        }
        self.publish(
            &source,
            layer,
            source_links.with_link(Neighbour {
                id: neighbour,
                distance,
            }),
            hold,
        );
        let target_links = target.links(layer).unwrap_or_default();
        if !target_links.contains(node) {
            self.publish(
                &target,
                layer,
                target_links.with_link(Neighbour { id: node, distance }),
                hold,
            );
        }
        let mut outcome = LinkOutcome {
            added: true,
            evicted: Vec::new(),
        };
        self.enforce_degree(&source, layer, hold, &mut outcome.evicted)?;
        self.enforce_degree(&target, layer, hold, &mut outcome.evicted)?;
        Ok(outcome)
    }

    /// Removes the link between `node` and `neighbour` at `layer` in both
    /// directions. Returns whether a link was removed.
    ///
    /// # Errors
    /// Returns [`HnswError::GraphInvariantViolation`] when `node` is absent or
    /// lacks `layer`.
    pub(crate) fn unlink(
        &self,
        node: DocId,
        layer: usize,
        neighbour: DocId,
        hold: &mut HoldList<Fragment>,
    ) -> Result<bool, HnswError> {
        let source = self.layer_record(node, layer)?;
        let removed = self.drop_half(&source, layer, neighbour, hold);
        if let Some(target) = self.node(neighbour).filter(|target| target.has_layer(layer)) {
            self.drop_half(&target, layer, node, hold);
        }
        Ok(removed)
    }

    /// Snapshot of current memory use, counting `on_hold_bytes` parked on the
    /// writer's hold list.
    pub(crate) fn memory_usage(&self, on_hold_bytes: usize) -> MemoryUsage {
        let table = self.table.load();
        let nodes = self.len();
        let live = table
            .heap_bytes()
            .saturating_add(self.record_bytes.load(Ordering::Acquire));
        let dead = table.slot_count().saturating_sub(nodes) * NodeTable::slot_bytes();
        let allocated = live.saturating_add(on_hold_bytes);
        MemoryUsage::new(
            allocated,
            allocated.saturating_sub(dead),
            dead,
            on_hold_bytes,
        )
    }

    fn layer_record(&self, doc: DocId, layer: usize) -> Result<Arc<NodeRecord>, HnswError> {
        let record = self
            .node(doc)
            .ok_or_else(|| HnswError::GraphInvariantViolation {
                message: format!("node {doc} is not in the graph"),
            })?;
        if record.has_layer(layer) {
            Ok(record)
        } else {
            Err(HnswError::GraphInvariantViolation {
                message: format!(
                    "node {doc} has level {} and cannot hold links at layer {layer}",
                    record.level()
                ),
            })
        }
    }

    fn table_fitting(&self, doc: DocId, hold: &mut HoldList<Fragment>) -> Arc<NodeTable> {
        let table = self.snapshot();
        if table.fits(doc) {
            return table;
        }
        let grown = Arc::new(table.grown_to_fit(doc));
        let previous = self.table.swap(Arc::clone(&grown));
        debug!(
            from = previous.slot_count(),
            to = grown.slot_count(),
            "node table grown"
        );
        hold.hold(Fragment::Table(previous));
        grown
    }

    fn publish(
        &self,
        record: &NodeRecord,
        layer: usize,
        links: LinkArray,
        hold: &mut HoldList<Fragment>,
    ) {
        let added = links.heap_bytes();
        if let Some(previous) = record.replace_links(layer, links) {
            let released = previous.heap_bytes();
            if added >= released {
                self.record_bytes
                    .fetch_add(added - released, Ordering::AcqRel);
            } else {
                self.record_bytes
                    .fetch_sub(released - added, Ordering::AcqRel);
            }
            hold.hold(Fragment::Links(previous));
        }
    }

    fn drop_half(
        &self,
        record: &NodeRecord,
        layer: usize,
        neighbour: DocId,
        hold: &mut HoldList<Fragment>,
    ) -> bool {
        let Some(trimmed) = record
            .links(layer)
            .and_then(|links| links.without(neighbour))
        else {
            return false;
        };
        self.publish(record, layer, trimmed, hold);
        true
    }

    /// Evicts links from `record` at `layer` until it fits the degree bound.
    ///
    /// Eviction is farthest-first with one exception: a link is kept while
    /// another victim exists if it is the target's only link at this layer.
    /// Removal does not repair neighbours, so a node stripped of its last
    /// link would stay unreachable until some later insert happened to link
    /// it again.
    fn enforce_degree(
        &self,
        record: &NodeRecord,
        layer: usize,
        hold: &mut HoldList<Fragment>,
        evicted: &mut Vec<(DocId, DocId)>,
    ) -> Result<(), HnswError> {
        let limit = self.connection_limit(layer);
        loop {
            let links = record.links(layer).unwrap_or_default();
            if links.len() <= limit {
                return Ok(());
            }
            let Some(victim) = self.eviction_candidate(&links, layer) else {
                return Ok(());
            };
            self.unlink(record.doc(), layer, victim.id, hold)?;
            evicted.push((record.doc(), victim.id));
            telemetry::record_link_evicted();
            debug!(
                node = record.doc(),
                evicted = victim.id,
                layer,
                distance = victim.distance,
                "link evicted to restore degree bound"
            );
        }
    }

    /// Farthest link whose target keeps at least one other link; the plain
    /// farthest link when every target would be left isolated.
    fn eviction_candidate(&self, links: &LinkArray, layer: usize) -> Option<Neighbour> {
        let mut ordered = links.links().to_vec();
        ordered.sort_unstable_by(|left, right| right.cmp(left));
        ordered
            .iter()
            .copied()
            .find(|link| {
                self.node(link.id)
                    .and_then(|target| target.links(layer))
                    .is_some_and(|target_links| target_links.len() > 1)
            })
            .or_else(|| ordered.first().copied())
    }
}
