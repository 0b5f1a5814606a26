//! Growable node table addressed by document id.

use std::mem::size_of;
use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::hnsw::{node::NodeRecord, types::DocId};

const MIN_TABLE_SLOTS: usize = 64;

/// Fixed-size array of node slots. Growing the graph replaces the whole
/// table with a larger copy that shares the existing records.
#[derive(Debug)]
pub(crate) struct NodeTable {
    slots: Box<[ArcSwapOption<NodeRecord>]>,
}

impl NodeTable {
    pub(crate) fn with_slots(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| ArcSwapOption::empty()).collect(),
        }
    }

    /// Copy of this table large enough to address `doc`.
    pub(crate) fn grown_to_fit(&self, doc: DocId) -> Self {
        let required = doc as usize + 1;
        let len = required
            .max(self.slots.len().saturating_mul(2))
            .max(MIN_TABLE_SLOTS);
        Self {
            slots: (0..len)
                .map(|index| {
                    ArcSwapOption::new(self.slots.get(index).and_then(ArcSwapOption::load_full))
                })
                .collect(),
        }
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn fits(&self, doc: DocId) -> bool {
        (doc as usize) < self.slots.len()
    }

    pub(crate) fn slot(&self, doc: DocId) -> Option<&ArcSwapOption<NodeRecord>> {
        self.slots.get(doc as usize)
    }

    pub(crate) fn get(&self, doc: DocId) -> Option<Arc<NodeRecord>> {
        self.slot(doc).and_then(ArcSwapOption::load_full)
    }

    /// Live records in ascending document order.
    pub(crate) fn records(&self) -> impl Iterator<Item = Arc<NodeRecord>> + '_ {
        self.slots.iter().filter_map(ArcSwapOption::load_full)
    }

    pub(crate) fn slot_bytes() -> usize {
        size_of::<ArcSwapOption<NodeRecord>>()
    }

    pub(crate) fn heap_bytes(&self) -> usize {
        size_of::<Self>() + self.slots.len() * Self::slot_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn growth_preserves_records() {
        let table = NodeTable::with_slots(2);
        table
            .slot(1)
            .expect("slot 1 exists")
            .store(Some(Arc::new(NodeRecord::new(1, 0))));
        assert!(!table.fits(70));
        let grown = table.grown_to_fit(70);
        assert!(grown.fits(70));
        assert_eq!(grown.slot_count(), 71.max(MIN_TABLE_SLOTS));
        assert_eq!(grown.get(1).map(|node| node.doc()), Some(1));
        assert!(grown.get(0).is_none());
        assert_eq!(grown.records().count(), 1);
    }

    #[test]
    fn small_tables_grow_to_the_minimum() {
        let grown = NodeTable::with_slots(0).grown_to_fit(0);
        assert_eq!(grown.slot_count(), MIN_TABLE_SLOTS);
        assert!(grown.heap_bytes() > MIN_TABLE_SLOTS);
    }
}
