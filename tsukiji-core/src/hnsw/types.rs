//! Identifiers, neighbour ordering, and the packed entry point.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

/// External identifier of an indexed document.
pub type DocId = u32;

/// Neighbour discovered during a search, including its distance from the query.
///
/// Orders by distance first and identifier second, so equal distances sort
/// deterministically.
///
/// # Examples
/// ```
/// use tsukiji_core::Neighbour;
///
/// let near = Neighbour { id: 3, distance: 0.42 };
/// let far = Neighbour { id: 1, distance: 0.9 };
/// assert!(near < far);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbour {
    /// Document identifier of the neighbour.
    pub id: DocId,
    /// Distance between the query and [`Neighbour::id`].
    pub distance: f32,
}

impl Eq for Neighbour {}

impl Ord for Neighbour {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.id.cmp(&other.id))
    }
}

impl PartialOrd for Neighbour {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-heap adaptor for [`Neighbour`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ReverseNeighbour {
    pub(crate) inner: Neighbour,
}

impl ReverseNeighbour {
    pub(crate) fn new(id: DocId, distance: f32) -> Self {
        Self {
            inner: Neighbour { id, distance },
        }
    }
}

impl Ord for ReverseNeighbour {
    fn cmp(&self, other: &Self) -> Ordering {
        other.inner.cmp(&self.inner)
    }
}

impl PartialOrd for ReverseNeighbour {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Entry point into the hierarchical graph: the node searches start from and
/// the highest layer it occupies.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct EntryPoint {
    /// Document at the top of the hierarchy.
    pub doc: DocId,
    /// Highest layer of [`EntryPoint::doc`].
    pub level: usize,
}

const EMPTY_ENTRY: u64 = u64::MAX;

/// Lock-free cell holding an optional [`EntryPoint`].
///
/// The document and level are packed into one word so readers never observe
/// a torn pair.
#[derive(Debug)]
pub(crate) struct EntryCell(AtomicU64);

impl EntryCell {
    pub(crate) const fn empty() -> Self {
        Self(AtomicU64::new(EMPTY_ENTRY))
    }

    pub(crate) fn load(&self) -> Option<EntryPoint> {
        unpack(self.0.load(AtomicOrdering::Acquire))
    }

    pub(crate) fn store(&self, entry: Option<EntryPoint>) {
        self.0.store(pack(entry), AtomicOrdering::Release);
    }
}

fn pack(entry: Option<EntryPoint>) -> u64 {
    entry.map_or(EMPTY_ENTRY, |EntryPoint { doc, level }| {
        // Levels are capped far below u32::MAX by the parameters.
        let level = u32::try_from(level).unwrap_or(u32::MAX - 1);
        (u64::from(doc) << 32) | u64::from(level)
    })
}

fn unpack(word: u64) -> Option<EntryPoint> {
    (word != EMPTY_ENTRY).then(|| EntryPoint {
        doc: (word >> 32) as DocId,
        level: (word & u64::from(u32::MAX)) as usize,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::BinaryHeap;

    #[rstest]
    #[case::origin(EntryPoint { doc: 0, level: 0 })]
    #[case::high_doc(EntryPoint { doc: u32::MAX, level: 3 })]
    #[case::high_level(EntryPoint { doc: 17, level: 16 })]
    fn entry_cell_preserves_entries(#[case] entry: EntryPoint) {
        let cell = EntryCell::empty();
        assert_eq!(cell.load(), None);
        cell.store(Some(entry));
        assert_eq!(cell.load(), Some(entry));
        cell.store(None);
        assert_eq!(cell.load(), None);
    }

    #[test]
    fn reverse_neighbour_pops_nearest_first() {
        let mut heap: BinaryHeap<_> = [(4, 0.9), (2, 0.1), (7, 0.5)]
            .into_iter()
            .map(|(id, distance)| ReverseNeighbour::new(id, distance))
            .collect();
        let order: Vec<_> = std::iter::from_fn(|| heap.pop())
            .map(|entry| entry.inner.id)
            .collect();
        assert_eq!(order, vec![2, 7, 4]);
    }

    #[test]
    fn neighbour_ties_break_on_identifier() {
        let mut neighbours = vec![
            Neighbour { id: 9, distance: 1.0 },
            Neighbour { id: 2, distance: 1.0 },
        ];
        neighbours.sort_unstable();
        assert_eq!(neighbours[0].id, 2);
    }
}
