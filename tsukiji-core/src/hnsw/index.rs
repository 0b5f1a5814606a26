//! The concurrent HNSW index.
//!
//! Readers ([`HnswIndex::search`], [`HnswIndex::prepare_add`]) run without
//! locks against `arc-swap` snapshots of the graph. Every mutation goes
//! through one writer lock and ends in a commit: the hold list is tagged
//! with the retiring generation, the generation advances, and fragments no
//! guard can observe any more are dropped.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use tracing::{debug, instrument, trace};

use crate::{
    distance::DistanceFunction,
    generation::{GenerationHandler, Guard, HoldList},
    memory::MemoryUsage,
    telemetry,
    vectors::DocVectorAccess,
};

use super::{
    error::HnswError,
    graph::{Fragment, GraphStore},
    invariants::HnswInvariantChecker,
    level::{InvLogLevelGenerator, LevelGenerator},
    params::HnswParams,
    prepare::PrepareResult,
    search::LayerSearcher,
    select::{select_heuristic, select_simple},
    types::{DocId, EntryPoint, Neighbour},
    validate::{QUERY_DOC, validate_vector},
};

/// Searches restarted after their entry point is removed mid-flight.
const ENTRY_ATTEMPTS: usize = 4;

/// Writer-owned state, reachable only through the writer lock.
#[derive(Debug)]
pub(super) struct WriterState {
    pub(super) hold: HoldList<Fragment>,
}

/// Concurrent HNSW index over vectors supplied by `V`.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use tsukiji_core::{HnswIndex, HnswParams, SquaredEuclidean, VectorStore};
///
/// let vectors = Arc::new(VectorStore::new());
/// let index = HnswIndex::new(HnswParams::new(4, 16)?, Arc::clone(&vectors), SquaredEuclidean);
/// for (doc, point) in [[0.0_f32, 0.0], [1.0, 0.0], [0.0, 3.0]].into_iter().enumerate() {
///     let doc = doc as u32;
///     vectors.set(doc, point.to_vec());
///     let prepared = index.prepare_add(index.take_guard(), doc, point.to_vec())?;
///     index.complete_add(prepared)?;
/// }
/// let nearest = index.search(&[0.9, 0.1], 1, 8)?;
/// assert_eq!(nearest[0].id, 1);
/// # Ok::<(), tsukiji_core::HnswError>(())
/// ```
pub struct HnswIndex<V> {
    params: HnswParams,
    graph: GraphStore,
    vectors: V,
    distance: Arc<dyn DistanceFunction>,
    levels: Box<dyn LevelGenerator>,
    generations: GenerationHandler,
    dimensions: OnceLock<usize>,
    on_hold_bytes: AtomicUsize,
    writer: Mutex<WriterState>,
}

impl<V: DocVectorAccess> HnswIndex<V> {
    /// Creates an empty index drawing levels from an [`InvLogLevelGenerator`]
    /// seeded by `params`.
    pub fn new(params: HnswParams, vectors: V, distance: impl DistanceFunction + 'static) -> Self {
        let levels = InvLogLevelGenerator::from_params(&params);
        Self::with_level_generator(params, vectors, distance, levels)
    }

    /// Creates an empty index with a caller-supplied level generator.
    pub fn with_level_generator(
        params: HnswParams,
        vectors: V,
        distance: impl DistanceFunction + 'static,
        levels: impl LevelGenerator + 'static,
    ) -> Self {
        let dimensions = params
            .dimensions()
            .map_or_else(OnceLock::new, |fixed| OnceLock::from(fixed.get()));
        Self {
            graph: GraphStore::new(params.max_connections()),
            vectors,
            distance: Arc::new(distance),
            levels: Box::new(levels),
            generations: GenerationHandler::new(),
            dimensions,
            on_hold_bytes: AtomicUsize::new(0),
            writer: Mutex::new(WriterState {
                hold: HoldList::new(),
            }),
            params,
        }
    }

    /// Construction parameters.
    #[must_use]
    pub fn params(&self) -> &HnswParams {
        &self.params
    }

    /// Vector accessor the index reads from.
    #[must_use]
    pub fn vectors(&self) -> &V {
        &self.vectors
    }

    /// Generation handler issuing the index's guards.
    #[must_use]
    pub fn generation_handler(&self) -> &GenerationHandler {
        &self.generations
    }

    /// Pins the current generation.
    #[must_use]
    pub fn take_guard(&self) -> Guard {
        self.generations.take_guard()
    }

    /// Reports whether `doc` is in the graph.
    #[must_use]
    pub fn contains(&self, doc: DocId) -> bool {
        self.graph.contains(doc)
    }

    /// Number of live documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.len()
    }

    /// Reports whether the graph has no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live documents in ascending order.
    #[must_use]
    pub fn documents(&self) -> Vec<DocId> {
        self.graph
            .snapshot()
            .records()
            .map(|node| node.doc())
            .collect()
    }

    /// Current search root.
    #[must_use]
    pub fn entry_point(&self) -> Option<EntryPoint> {
        self.graph.entry_point()
    }

    /// Top layer of `doc`, if present.
    #[must_use]
    pub fn node_level(&self, doc: DocId) -> Option<usize> {
        self.graph.node(doc).map(|node| node.level())
    }

    /// Links of `doc` at `layer`; `None` when the node or layer is absent.
    #[must_use]
    pub fn neighbours(&self, doc: DocId, layer: usize) -> Option<Vec<Neighbour>> {
        self.graph
            .node(doc)
            .and_then(|node| node.links(layer))
            .map(|links| links.links().to_vec())
    }

    /// Dimensionality fixed by the parameters or the first prepared vector.
    #[must_use]
    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions.get().copied()
    }

    /// Memory snapshot covering live graph state and unreclaimed fragments.
    #[must_use]
    pub fn memory_usage(&self) -> MemoryUsage {
        self.graph
            .memory_usage(self.on_hold_bytes.load(Ordering::Acquire))
    }

    /// Structural invariant checks over a quiescent snapshot.
    #[must_use]
    pub fn invariants(&self) -> HnswInvariantChecker<'_, V> {
        HnswInvariantChecker::new(self)
    }

    /// Checks `vector` against the index dimensionality, fixing it on first
    /// use.
    ///
    /// # Errors
    /// Returns [`HnswError::InvalidVector`] for empty or non-finite vectors
    /// and [`HnswError::DimensionMismatch`] for a wrong length.
    pub fn validate_vector(&self, doc: DocId, vector: &[f32]) -> Result<(), HnswError> {
        validate_vector(doc, vector, None)?;
        let expected = *self.dimensions.get_or_init(|| vector.len());
        validate_vector(doc, vector, Some(expected))
    }

    /// Read-only first phase of an insert: draws a level and collects
    /// candidate neighbours for every layer the new node will share with the
    /// current graph.
    ///
    /// `guard` must have been taken before this call and is carried to
    /// completion inside the result. An empty graph yields a result without
    /// candidates.
    ///
    /// # Errors
    /// Returns validation errors for the vector and
    /// [`HnswError::Distance`] when the distance function fails.
    #[instrument(level = "trace", skip(self, guard, vector), fields(generation = guard.generation().get()))]
    pub fn prepare_add(
        &self,
        guard: Guard,
        doc: DocId,
        vector: impl Into<Arc<[f32]>>,
    ) -> Result<PrepareResult, HnswError> {
        let vector = vector.into();
        self.validate_vector(doc, &vector)?;
        let level = self.levels.next_level();
        let layers = self.collect_candidates(doc, &vector, level)?;
        trace!(doc, level, layers = layers.len(), "insert prepared");
        Ok(PrepareResult {
            doc,
            level,
            layers,
            vector,
            guard,
        })
    }

    /// Serialized second phase of an insert. The prepare guard is released
    /// before the commit so the superseded fragments can be reclaimed
    /// straight away.
    ///
    /// Links the new node to every candidate that is still present and tall
    /// enough; stale candidates are skipped. When none of the layer-zero
    /// candidates survive, the node is linked to the entry point instead.
    ///
    /// # Errors
    /// Returns [`HnswError::DuplicateNode`] when `doc` is already present and
    /// [`HnswError::GraphInvariantViolation`] when the graph is inconsistent.
    #[instrument(level = "debug", skip(self, prepared), fields(doc = prepared.doc, level = prepared.level))]
    pub fn complete_add(&self, prepared: PrepareResult) -> Result<(), HnswError> {
        let mut writer = self.lock_writer()?;
        self.apply_add(&mut writer.hold, &prepared)?;
        // The writer never reads through the prepare guard.
        drop(prepared);
        self.commit(&mut writer);
        telemetry::record_document_added();
        Ok(())
    }

    /// Replaces `doc` with the prepared node under one generation advance.
    /// Behaves like [`complete_add`](Self::complete_add) when `doc` is absent.
    ///
    /// # Errors
    /// As for [`complete_add`](Self::complete_add).
    #[instrument(level = "debug", skip(self, prepared), fields(doc = prepared.doc, level = prepared.level))]
    pub fn complete_update(&self, prepared: PrepareResult) -> Result<(), HnswError> {
        let mut writer = self.lock_writer()?;
        let replaced = self.apply_remove(&mut writer.hold, prepared.doc)?;
        self.apply_add(&mut writer.hold, &prepared)?;
        drop(prepared);
        self.commit(&mut writer);
        if replaced {
            telemetry::record_document_removed();
        }
        telemetry::record_document_added();
        Ok(())
    }

    /// Unlinks `doc` from every neighbour, repairs the entry point, and
    /// removes the node. Neighbours keep their remaining links without
    /// repair.
    ///
    /// Returns `Ok(false)` without touching the graph or advancing the
    /// generation when `doc` is absent.
    ///
    /// # Errors
    /// Returns [`HnswError::GraphInvariantViolation`] when the graph is
    /// inconsistent.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_document(&self, doc: DocId) -> Result<bool, HnswError> {
        let mut writer = self.lock_writer()?;
        if !self.apply_remove(&mut writer.hold, doc)? {
            trace!(doc, "remove of absent document ignored");
            return Ok(false);
        }
        self.commit(&mut writer);
        telemetry::record_document_removed();
        Ok(true)
    }

    /// Returns up to `k` nearest documents to `query` in ascending distance,
    /// searching layer zero with breadth `max(ef, k)`.
    ///
    /// Documents removed while the search runs are dropped from the result.
    /// A search whose entry point disappears restarts from the new one.
    ///
    /// # Errors
    /// Returns validation errors for the query (reported against document id
    /// `u32::MAX`) and distance failures.
    pub fn search(&self, query: &[f32], k: usize, ef: usize) -> Result<Vec<Neighbour>, HnswError> {
        validate_vector(QUERY_DOC, query, self.dimensions())?;
        let _guard = self.take_guard();
        if k == 0 {
            return Ok(Vec::new());
        }
        for attempt in 0..ENTRY_ATTEMPTS {
            let Some(entry_point) = self.graph.entry_point() else {
                return Ok(Vec::new());
            };
            let table = self.graph.snapshot();
            let searcher = LayerSearcher::new(&table, &self.vectors, &*self.distance, query);
            let mut found = match self.live_entry(&searcher, entry_point)? {
                Some(mut entry) => {
                    for layer in (1..=entry_point.level).rev() {
                        entry = searcher.greedy_search_layer(entry, layer)?;
                    }
                    searcher.search_layer(&[entry], 0, ef.max(k))?
                }
                None => Vec::new(),
            };
            found.retain(|neighbour| self.graph.contains(neighbour.id));
            if !found.is_empty() {
                found.truncate(k);
                return Ok(found);
            }
            trace!(attempt, entry = entry_point.doc, "entry point removed during search");
        }
        Ok(Vec::new())
    }

    /// Drops held fragments that no live guard can observe any more, without
    /// mutating the graph. Returns the bytes released.
    ///
    /// # Errors
    /// Returns [`HnswError::LockPoisoned`] when the writer lock is poisoned.
    pub fn reclaim_memory(&self) -> Result<usize, HnswError> {
        let mut writer = self.lock_writer()?;
        let first_used = self.generations.first_used_generation();
        let freed = writer.hold.trim(first_used);
        self.publish_hold_bytes(&writer.hold);
        Ok(freed)
    }

    pub(super) fn graph(&self) -> &GraphStore {
        &self.graph
    }

    pub(super) fn lock_writer(&self) -> Result<MutexGuard<'_, WriterState>, HnswError> {
        self.writer.lock().map_err(|_| HnswError::LockPoisoned {
            resource: "index writer",
        })
    }

    fn collect_candidates(
        &self,
        doc: DocId,
        vector: &[f32],
        level: usize,
    ) -> Result<Vec<Vec<Neighbour>>, HnswError> {
        for attempt in 0..ENTRY_ATTEMPTS {
            let Some(entry_point) = self.graph.entry_point() else {
                return Ok(Vec::new());
            };
            if let Some(selected) = self.search_candidates(doc, vector, level, entry_point)? {
                return Ok(selected);
            }
            trace!(attempt, doc, entry = entry_point.doc, "entry point removed during prepare");
        }
        Ok(Vec::new())
    }

    /// One candidate search from `entry_point`. Yields `None` when the
    /// search lost every live node to a concurrent removal.
    fn search_candidates(
        &self,
        doc: DocId,
        vector: &[f32],
        level: usize,
        entry_point: EntryPoint,
    ) -> Result<Option<Vec<Vec<Neighbour>>>, HnswError> {
        let table = self.graph.snapshot();
        let searcher = LayerSearcher::new(&table, &self.vectors, &*self.distance, vector);
        let Some(mut entry) = self.live_entry(&searcher, entry_point)? else {
            return Ok(None);
        };
        for layer in (level + 1..=entry_point.level).rev() {
            entry = searcher.greedy_search_layer(entry, layer)?;
        }
        let top = level.min(entry_point.level);
        let mut entries = vec![entry];
        let mut selected = Vec::with_capacity(top + 1);
        for layer in (0..=top).rev() {
            let mut found = searcher.search_layer(&entries, layer, self.params.ef_construction())?;
            found.retain(|neighbour| self.graph.contains(neighbour.id));
            if found.is_empty() {
                return Ok(None);
            }
            let candidates: Vec<_> = found.iter().copied().filter(|n| n.id != doc).collect();
            selected.push(self.select_neighbours(&candidates)?);
            entries = found;
        }
        selected.reverse();
        Ok(Some(selected))
    }

    /// Scores the entry point, rejecting it when the writer removed it after
    /// it was read. Liveness is checked against the current table because a
    /// snapshot taken before a table growth keeps stale slots.
    fn live_entry(
        &self,
        searcher: &LayerSearcher<'_, V>,
        entry_point: EntryPoint,
    ) -> Result<Option<Neighbour>, HnswError> {
        let entry = searcher.entry(entry_point.doc)?;
        Ok(entry.filter(|entry| self.graph.contains(entry.id)))
    }

    fn select_neighbours(&self, candidates: &[Neighbour]) -> Result<Vec<Neighbour>, HnswError> {
        let limit = self.params.max_connections();
        if self.params.heuristic_select_neighbours() {
            select_heuristic(candidates, limit, &self.vectors, &*self.distance)
        } else {
            Ok(select_simple(candidates, limit))
        }
    }

    fn apply_add(
        &self,
        hold: &mut HoldList<Fragment>,
        prepared: &PrepareResult,
    ) -> Result<(), HnswError> {
        let doc = prepared.doc;
        if self.graph.contains(doc) {
            return Err(HnswError::DuplicateNode { node: doc });
        }
        self.graph.set_node(doc, prepared.level, hold)?;
        for (layer, candidates) in prepared.layers.iter().enumerate().take(prepared.level + 1) {
            for candidate in candidates {
                let valid = candidate.id != doc
                    && self
                        .graph
                        .node(candidate.id)
                        .is_some_and(|node| node.has_layer(layer));
                if valid {
                    self.graph
                        .link(doc, layer, candidate.id, candidate.distance, hold)?;
                } else {
                    telemetry::record_stale_candidate();
                    trace!(doc, candidate = candidate.id, layer, "stale candidate skipped");
                }
            }
        }
        self.ensure_base_link(hold, prepared)?;
        match self.graph.entry_point() {
            Some(current) if current.level >= prepared.level => {}
            _ => self.graph.update_entry_point(Some(EntryPoint {
                doc,
                level: prepared.level,
            })),
        }
        Ok(())
    }

    /// Links a node left without layer-zero links to the entry point so it
    /// stays reachable.
    fn ensure_base_link(
        &self,
        hold: &mut HoldList<Fragment>,
        prepared: &PrepareResult,
    ) -> Result<(), HnswError> {
        let doc = prepared.doc;
        let linked = self
            .graph
            .node(doc)
            .and_then(|node| node.links(0))
            .is_some_and(|links| links.len() > 0);
        if linked {
            return Ok(());
        }
        let Some(entry) = self.graph.entry_point().filter(|entry| entry.doc != doc) else {
            return Ok(());
        };
        let entry_vector = self
            .vectors
            .get_vector(entry.doc)
            .ok_or(HnswError::MissingVector { doc: entry.doc })?;
        let distance = self.distance.distance(&prepared.vector, &entry_vector)?;
        debug!(doc, entry = entry.doc, "linking to entry point after stale candidates");
        self.graph
            .link(doc, 0, entry.doc, distance.value(), hold)?;
        Ok(())
    }

    fn apply_remove(&self, hold: &mut HoldList<Fragment>, doc: DocId) -> Result<bool, HnswError> {
        if self.graph.remove_node(doc, hold)?.is_none() {
            return Ok(false);
        }
        if self
            .graph
            .entry_point()
            .is_some_and(|entry| entry.doc == doc)
        {
            self.graph.update_entry_point(self.graph.highest_node());
        }
        Ok(true)
    }

    fn commit(&self, writer: &mut WriterState) {
        let retired = self.generations.current_generation();
        writer.hold.transfer(retired);
        let current = self.generations.advance_generation();
        let first_used = self.generations.first_used_generation();
        writer.hold.trim(first_used);
        self.publish_hold_bytes(&writer.hold);
        trace!(
            generation = current.get(),
            first_used = first_used.get(),
            "mutation committed"
        );
    }

    fn publish_hold_bytes(&self, hold: &HoldList<Fragment>) {
        let bytes = hold.held_bytes();
        self.on_hold_bytes.store(bytes, Ordering::Release);
        telemetry::record_hold_bytes(bytes);
    }
}

impl<V> std::fmt::Debug for HnswIndex<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HnswIndex")
            .field("params", &self.params)
            .field("distance", &self.distance.name())
            .field("nodes", &self.graph.len())
            .field("entry_point", &self.graph.entry_point())
            .field("generations", &self.generations)
            .finish_non_exhaustive()
    }
}
