//! Node records and their per-layer link arrays.
//!
//! Both are immutable once published except for the per-layer `ArcSwap`
//! slots, which the writer replaces wholesale on every link change.

use std::mem::size_of;
use std::sync::Arc;

use arc_swap::ArcSwap;

use super::types::{DocId, Neighbour};

/// Immutable adjacency list of one (node, layer) pair.
#[derive(Debug, Default)]
pub(crate) struct LinkArray {
    links: Box<[Neighbour]>,
}

impl LinkArray {
    pub(crate) fn from_links(links: Vec<Neighbour>) -> Self {
        Self {
            links: links.into_boxed_slice(),
        }
    }

    pub(crate) fn links(&self) -> &[Neighbour] {
        &self.links
    }

    pub(crate) fn len(&self) -> usize {
        self.links.len()
    }

    pub(crate) fn contains(&self, id: DocId) -> bool {
        self.links.iter().any(|link| link.id == id)
    }

    /// Copy of this array with `link` appended.
    pub(crate) fn with_link(&self, link: Neighbour) -> Self {
        let mut links = Vec::with_capacity(self.links.len() + 1);
        links.extend_from_slice(&self.links);
        links.push(link);
        Self::from_links(links)
    }

    /// Copy of this array without `id`, or `None` when `id` is absent.
    pub(crate) fn without(&self, id: DocId) -> Option<Self> {
        self.contains(id).then(|| {
            Self::from_links(
                self.links
                    .iter()
                    .copied()
                    .filter(|link| link.id != id)
                    .collect(),
            )
        })
    }

    pub(crate) fn heap_bytes(&self) -> usize {
        size_of::<Self>() + self.links.len() * size_of::<Neighbour>()
    }
}

/// Graph node: its fixed top layer plus one swappable link array per layer.
#[derive(Debug)]
pub(crate) struct NodeRecord {
    doc: DocId,
    layers: Box<[ArcSwap<LinkArray>]>,
}

impl NodeRecord {
    pub(crate) fn new(doc: DocId, level: usize) -> Self {
        Self {
            doc,
            layers: (0..=level)
                .map(|_| ArcSwap::from_pointee(LinkArray::default()))
                .collect(),
        }
    }

    pub(crate) fn doc(&self) -> DocId {
        self.doc
    }

    /// Highest layer this node participates in.
    pub(crate) fn level(&self) -> usize {
        self.layers.len().saturating_sub(1)
    }

    pub(crate) fn has_layer(&self, layer: usize) -> bool {
        layer < self.layers.len()
    }

    /// Snapshot of the links at `layer`; `None` above the node's level.
    pub(crate) fn links(&self, layer: usize) -> Option<Arc<LinkArray>> {
        self.layers.get(layer).map(ArcSwap::load_full)
    }

    /// Publishes `links` at `layer` and returns the superseded array.
    pub(crate) fn replace_links(&self, layer: usize, links: LinkArray) -> Option<Arc<LinkArray>> {
        self.layers
            .get(layer)
            .map(|slot| slot.swap(Arc::new(links)))
    }

    /// Bytes of the record itself, excluding its link arrays.
    pub(crate) fn heap_bytes(&self) -> usize {
        size_of::<Self>() + self.layers.len() * size_of::<ArcSwap<LinkArray>>()
    }

    /// Bytes of the record plus its current link arrays.
    pub(crate) fn total_bytes(&self) -> usize {
        self.layers
            .iter()
            .map(|slot| slot.load().heap_bytes())
            .fold(self.heap_bytes(), usize::saturating_add)
    }
}
