//! Deferred-free queue of superseded graph fragments.

use std::collections::VecDeque;

use tracing::debug;

use super::Generation;

/// Fragment that can be parked on a [`HoldList`].
pub trait Reclaimable {
    /// Heap bytes released when the fragment is dropped.
    fn reclaimable_bytes(&self) -> usize;
}

#[derive(Debug)]
struct HeldBucket<T> {
    generation: Generation,
    fragments: Vec<T>,
    bytes: usize,
}

/// Per-generation hold list.
///
/// Fragments accumulate in a current bucket while the writer mutates. On
/// commit, [`transfer`](Self::transfer) tags the bucket with the generation
/// being retired; [`trim`](Self::trim) later drops every bucket whose tag is
/// strictly below the first used generation.
///
/// # Examples
/// ```
/// use tsukiji_core::generation::{HoldList, Reclaimable};
/// use tsukiji_core::Generation;
///
/// struct Blob(Vec<u8>);
/// impl Reclaimable for Blob {
///     fn reclaimable_bytes(&self) -> usize {
///         self.0.len()
///     }
/// }
///
/// let mut hold = HoldList::new();
/// hold.hold(Blob(vec![0; 64]));
/// hold.transfer(Generation::new(3));
/// assert_eq!(hold.trim(Generation::new(3)), 0);
/// assert_eq!(hold.trim(Generation::new(4)), 64);
/// assert_eq!(hold.held_bytes(), 0);
/// ```
#[derive(Debug)]
pub struct HoldList<T> {
    current: Vec<T>,
    current_bytes: usize,
    pending: VecDeque<HeldBucket<T>>,
    pending_bytes: usize,
}

impl<T: Reclaimable> HoldList<T> {
    /// Creates an empty hold list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            current: Vec::new(),
            current_bytes: 0,
            pending: VecDeque::new(),
            pending_bytes: 0,
        }
    }

    /// Parks `fragment` in the current bucket.
    pub fn hold(&mut self, fragment: T) {
        self.current_bytes = self
            .current_bytes
            .saturating_add(fragment.reclaimable_bytes());
        self.current.push(fragment);
    }

    /// Tags the current bucket with `generation` and moves it to pending.
    pub fn transfer(&mut self, generation: Generation) {
        if self.current.is_empty() {
            return;
        }
        let fragments = std::mem::take(&mut self.current);
        let bytes = std::mem::take(&mut self.current_bytes);
        self.pending_bytes = self.pending_bytes.saturating_add(bytes);
        match self.pending.back_mut() {
            Some(last) if last.generation == generation => {
                last.fragments.extend(fragments);
                last.bytes = last.bytes.saturating_add(bytes);
            }
            _ => self.pending.push_back(HeldBucket {
                generation,
                fragments,
                bytes,
            }),
        }
    }

    /// Drops every pending bucket tagged strictly below `first_used` and
    /// returns the number of bytes released.
    pub fn trim(&mut self, first_used: Generation) -> usize {
        let mut freed_bytes = 0_usize;
        let mut freed_fragments = 0_usize;
        while self
            .pending
            .front()
            .is_some_and(|bucket| bucket.generation < first_used)
        {
            if let Some(bucket) = self.pending.pop_front() {
                freed_bytes = freed_bytes.saturating_add(bucket.bytes);
                freed_fragments = freed_fragments.saturating_add(bucket.fragments.len());
            }
        }
        self.pending_bytes = self.pending_bytes.saturating_sub(freed_bytes);
        if freed_fragments > 0 {
            debug!(
                first_used = first_used.get(),
                freed_fragments, freed_bytes, "hold list trimmed"
            );
        }
        freed_bytes
    }

    /// Bytes parked in the current and pending buckets.
    #[must_use]
    pub const fn held_bytes(&self) -> usize {
        self.current_bytes.saturating_add(self.pending_bytes)
    }

    /// Number of parked fragments.
    #[must_use]
    pub fn held_fragments(&self) -> usize {
        self.current.len()
            + self
                .pending
                .iter()
                .map(|bucket| bucket.fragments.len())
                .sum::<usize>()
    }

    /// Oldest generation tag still pending, if any.
    #[must_use]
    pub fn oldest_pending(&self) -> Option<Generation> {
        self.pending.front().map(|bucket| bucket.generation)
    }
}

impl<T: Reclaimable> Default for HoldList<T> {
    fn default() -> Self {
        Self::new()
    }
}
