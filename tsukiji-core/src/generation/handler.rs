//! Generation counter, read guards, and first-used tracking.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering, fence};
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use tracing::trace;

/// Monotonically increasing epoch counter.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Generation(u64);

impl Generation {
    /// Wraps a raw generation value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw generation value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub(crate) const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Shared marker for one generation. Every live [`Guard`] holds a strong
/// reference to the marker of the generation it pinned.
#[derive(Debug)]
struct GenerationHold {
    generation: Generation,
}

/// Read guard pinning the generation that was current when it was taken.
///
/// Cloning a guard pins the same generation; the pin is released when the
/// last clone is dropped.
#[derive(Clone, Debug)]
pub struct Guard {
    hold: Arc<GenerationHold>,
}

impl Guard {
    /// Returns the pinned generation.
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.hold.generation
    }
}

/// Issues guards and computes the oldest generation still observed.
///
/// Taking and dropping guards is lock-free: a guard is a clone of the
/// `Arc` published for the current generation. Only the writer-side calls
/// [`advance_generation`](Self::advance_generation) and
/// [`first_used_generation`](Self::first_used_generation) touch the retired
/// queue.
///
/// # Examples
/// ```
/// use tsukiji_core::{Generation, GenerationHandler};
///
/// let handler = GenerationHandler::new();
/// let guard = handler.take_guard();
/// handler.advance_generation();
/// assert_eq!(handler.current_generation(), Generation::new(1));
/// assert_eq!(handler.first_used_generation(), Generation::new(0));
/// drop(guard);
/// assert_eq!(handler.first_used_generation(), Generation::new(1));
/// ```
pub struct GenerationHandler {
    current: ArcSwap<GenerationHold>,
    retired: Mutex<VecDeque<Arc<GenerationHold>>>,
    first_used: AtomicU64,
}

impl GenerationHandler {
    /// Creates a handler starting at generation zero.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(Generation::default())
    }

    /// Creates a handler starting at `generation`.
    #[must_use]
    pub fn starting_at(generation: Generation) -> Self {
        Self {
            current: ArcSwap::from_pointee(GenerationHold { generation }),
            retired: Mutex::new(VecDeque::new()),
            first_used: AtomicU64::new(generation.get()),
        }
    }

    /// Pins the current generation.
    #[must_use]
    pub fn take_guard(&self) -> Guard {
        Guard {
            hold: self.current.load_full(),
        }
    }

    /// Returns the current generation.
    #[must_use]
    pub fn current_generation(&self) -> Generation {
        self.current.load().generation
    }

    /// Increments the current generation.
    ///
    /// Must only be called by the serialized writer once a mutation has been
    /// committed.
    pub fn advance_generation(&self) -> Generation {
        let next = self.current_generation().next();
        let retired = self
            .current
            .swap(Arc::new(GenerationHold { generation: next }));
        self.retired_queue().push_back(retired);
        trace!(generation = next.get(), "generation advanced");
        next
    }

    /// Returns the oldest generation pinned by a live guard, or the current
    /// generation when no older guard remains.
    ///
    /// The value never decreases between calls.
    #[must_use]
    pub fn first_used_generation(&self) -> Generation {
        let observed = {
            let mut retired = self.retired_queue();
            // A retired marker held only by this queue can never be pinned
            // again: new guards only clone the current marker.
            while retired
                .front()
                .is_some_and(|hold| Arc::strong_count(hold) == 1)
            {
                retired.pop_front();
            }
            fence(Ordering::Acquire);
            match retired.front() {
                Some(oldest) => oldest.generation,
                None => self.current_generation(),
            }
        };
        let previous = self.first_used.fetch_max(observed.get(), Ordering::AcqRel);
        Generation::new(previous.max(observed.get()))
    }

    /// Number of retired generations still pinned or awaiting a
    /// [`first_used_generation`](Self::first_used_generation) sweep.
    #[must_use]
    pub fn retired_generations(&self) -> usize {
        self.retired_queue().len()
    }

    fn retired_queue(&self) -> std::sync::MutexGuard<'_, VecDeque<Arc<GenerationHold>>> {
        // The queue holds plain markers; a panic while it was locked cannot
        // leave it logically inconsistent.
        self.retired.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for GenerationHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GenerationHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationHandler")
            .field("current", &self.current_generation())
            .field("first_used", &self.first_used.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::thread;

    #[test]
    fn first_used_equals_current_without_guards() {
        let handler = GenerationHandler::new();
        for expected in 1..=3 {
            handler.advance_generation();
            assert_eq!(handler.first_used_generation(), Generation::new(expected));
        }
        assert_eq!(handler.retired_generations(), 0);
    }

    #[rstest]
    #[case::single_advance(1)]
    #[case::many_advances(5)]
    fn guard_pins_its_generation(#[case] advances: u64) {
        let handler = GenerationHandler::new();
        let guard = handler.take_guard();
        for _ in 0..advances {
            handler.advance_generation();
        }
        assert_eq!(guard.generation(), Generation::new(0));
        assert_eq!(handler.first_used_generation(), Generation::new(0));
        drop(guard);
        assert_eq!(handler.first_used_generation(), Generation::new(advances));
    }

    #[test]
    fn clones_keep_the_pin_until_the_last_drop() {
        let handler = GenerationHandler::new();
        let guard = handler.take_guard();
        let clone = guard.clone();
        handler.advance_generation();
        drop(guard);
        assert_eq!(handler.first_used_generation(), Generation::new(0));
        drop(clone);
        assert_eq!(handler.first_used_generation(), Generation::new(1));
    }

    #[test]
    fn oldest_guard_bounds_first_used() {
        let handler = GenerationHandler::new();
        handler.advance_generation();
        let older = handler.take_guard();
        handler.advance_generation();
        let newer = handler.take_guard();
        handler.advance_generation();

        assert_eq!(handler.first_used_generation(), Generation::new(1));
        drop(older);
        assert_eq!(handler.first_used_generation(), Generation::new(2));
        drop(newer);
        assert_eq!(handler.first_used_generation(), Generation::new(3));
    }

    #[test]
    fn first_used_never_decreases_under_concurrent_guards() {
        let handler = GenerationHandler::new();
        thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..500 {
                        let guard = handler.take_guard();
                        assert!(guard.generation() <= handler.current_generation());
                    }
                });
            }
            let mut last = Generation::default();
            for _ in 0..500 {
                handler.advance_generation();
                let first_used = handler.first_used_generation();
                assert!(first_used >= last, "first used went backwards");
                assert!(first_used <= handler.current_generation());
                last = first_used;
            }
        });
        assert_eq!(
            handler.first_used_generation(),
            handler.current_generation()
        );
    }
}
