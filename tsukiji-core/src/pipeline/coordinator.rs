//! Wires the index, the vector store and both executors together.

use std::fmt;
use std::sync::{Arc, OnceLock};

use dashmap::DashSet;
use tracing::{error, instrument, trace};

use crate::{
    distance::DistanceFunction,
    hnsw::{DocId, HnswError, HnswIndex, HnswParams, PrepareResult},
    vectors::VectorStore,
};

use super::{MutationExecutor, PipelineConfig, PipelineError, PrepareWorkers};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Completion {
    Add,
    Update,
}

/// State shared with tasks running on the executors.
struct Core {
    index: HnswIndex<Arc<VectorStore>>,
    in_flight: DashSet<DocId>,
    failure: OnceLock<HnswError>,
}

impl Core {
    fn halted(&self) -> Result<(), PipelineError> {
        match self.failure.get() {
            Some(source) => Err(PipelineError::Halted {
                source: source.clone(),
            }),
            None => Ok(()),
        }
    }

    fn halt(&self, failure: HnswError) {
        error!(code = %failure.code(), error = %failure, "writer failed; pipeline halted");
        let _ = self.failure.set(failure);
    }

    fn complete(&self, prepared: Result<PrepareResult, HnswError>, completion: Completion) {
        if self.failure.get().is_some() {
            return;
        }
        let result = prepared.and_then(|prepared| {
            // A duplicate add must not clobber the live node's vector.
            if completion == Completion::Add && self.index.contains(prepared.doc) {
                return Err(HnswError::DuplicateNode { node: prepared.doc });
            }
            self.index
                .vectors()
                .set(prepared.doc, Arc::clone(&prepared.vector));
            match completion {
                Completion::Add => self.index.complete_add(prepared),
                Completion::Update => self.index.complete_update(prepared),
            }
        });
        if let Err(failure) = result {
            self.halt(failure);
        }
    }

    fn remove(&self, doc: DocId) {
        if self.failure.get().is_some() {
            return;
        }
        match self.index.remove_document(doc) {
            Ok(removed) => {
                self.index.vectors().remove(doc);
                trace!(doc, removed, "remove applied");
            }
            Err(failure) => self.halt(failure),
        }
    }
}

/// Marks a document as having an operation in flight until dropped.
struct Claim {
    core: Arc<Core>,
    doc: DocId,
}

impl Claim {
    fn acquire(core: &Arc<Core>, doc: DocId) -> Result<Self, PipelineError> {
        if !core.in_flight.insert(doc) {
            return Err(PipelineError::DocumentBusy { doc });
        }
        Ok(Self {
            core: Arc::clone(core),
            doc,
        })
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        self.core.in_flight.remove(&self.doc);
    }
}

/// Concurrent mutation pipeline over an [`HnswIndex`].
///
/// Adds and updates are prepared on [`PrepareWorkers`] and completed on the
/// [`MutationExecutor`]; removals go straight to the executor. At most one
/// operation per document is in flight. The first writer failure halts the
/// pipeline: later submissions and [`drain`](Self::drain) report it as
/// [`PipelineError::Halted`].
///
/// # Examples
/// ```
/// use tsukiji_core::{HnswParams, Pipeline, PipelineConfig, SquaredEuclidean};
///
/// let config = PipelineConfig::default().with_prepare_threads(2)?;
/// let pipeline = Pipeline::new(HnswParams::new(4, 16)?, SquaredEuclidean, config)?;
/// for doc in 0..8_u32 {
///     pipeline.submit_add(doc, vec![doc as f32, 1.0])?;
/// }
/// pipeline.drain()?;
/// assert_eq!(pipeline.index().len(), 8);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Pipeline {
    core: Arc<Core>,
    prepare: PrepareWorkers,
    mutations: Arc<MutationExecutor>,
}

impl Pipeline {
    /// Builds an empty index backed by a fresh [`VectorStore`].
    ///
    /// # Errors
    /// Returns [`PipelineError::ThreadPool`] when workers cannot be started.
    pub fn new(
        params: HnswParams,
        distance: impl DistanceFunction + 'static,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        let index = HnswIndex::new(params, Arc::new(VectorStore::new()), distance);
        Self::with_index(index, config)
    }

    /// Drives an existing index. Its vector store receives the vectors of
    /// submitted documents.
    ///
    /// # Errors
    /// Returns [`PipelineError::ThreadPool`] when workers cannot be started.
    pub fn with_index(
        index: HnswIndex<Arc<VectorStore>>,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        let prepare = PrepareWorkers::new(&config)?;
        let mutations = Arc::new(MutationExecutor::new(config.write_queue_depth())?);
        Ok(Self {
            core: Arc::new(Core {
                index,
                in_flight: DashSet::new(),
                failure: OnceLock::new(),
            }),
            prepare,
            mutations,
        })
    }

    /// The index being mutated.
    #[must_use]
    pub fn index(&self) -> &HnswIndex<Arc<VectorStore>> {
        &self.core.index
    }

    /// Vectors of the documents currently stored.
    #[must_use]
    pub fn vectors(&self) -> &VectorStore {
        self.core.index.vectors()
    }

    /// Reports whether `doc` has an operation in flight.
    #[must_use]
    pub fn is_in_flight(&self, doc: DocId) -> bool {
        self.core.in_flight.contains(&doc)
    }

    /// The writer failure that halted the pipeline, if any.
    #[must_use]
    pub fn failure(&self) -> Option<&HnswError> {
        self.core.failure.get()
    }

    /// Queues insertion of `doc`.
    ///
    /// # Errors
    /// Returns [`PipelineError::Halted`] after a writer failure,
    /// [`PipelineError::DocumentBusy`] when `doc` is in flight and
    /// [`PipelineError::Index`] for an invalid vector.
    #[instrument(level = "debug", skip(self, vector))]
    pub fn submit_add(
        &self,
        doc: DocId,
        vector: impl Into<Arc<[f32]>>,
    ) -> Result<(), PipelineError> {
        self.submit_prepared(doc, vector.into(), Completion::Add)
    }

    /// Queues replacement of `doc`'s vector; behaves as an add when `doc` is
    /// absent at completion.
    ///
    /// # Errors
    /// As for [`submit_add`](Self::submit_add).
    #[instrument(level = "debug", skip(self, vector))]
    pub fn submit_update(
        &self,
        doc: DocId,
        vector: impl Into<Arc<[f32]>>,
    ) -> Result<(), PipelineError> {
        self.submit_prepared(doc, vector.into(), Completion::Update)
    }

    /// Queues removal of `doc`. Removing an absent document is a no-op.
    ///
    /// # Errors
    /// Returns [`PipelineError::Halted`] after a writer failure,
    /// [`PipelineError::DocumentBusy`] when `doc` is in flight and
    /// [`PipelineError::Shutdown`] when the executor is gone.
    #[instrument(level = "debug", skip(self))]
    pub fn submit_remove(&self, doc: DocId) -> Result<(), PipelineError> {
        self.core.halted()?;
        let claim = Claim::acquire(&self.core, doc)?;
        self.mutations.execute(move || {
            claim.core.remove(claim.doc);
            drop(claim);
        })
    }

    /// Waits until every submitted operation has been applied.
    ///
    /// # Errors
    /// Returns [`PipelineError::Halted`] when a writer failure occurred.
    pub fn drain(&self) -> Result<(), PipelineError> {
        self.prepare.sync();
        self.mutations.sync()?;
        self.core.halted()
    }

    fn submit_prepared(
        &self,
        doc: DocId,
        vector: Arc<[f32]>,
        completion: Completion,
    ) -> Result<(), PipelineError> {
        self.core.halted()?;
        self.core.index.validate_vector(doc, &vector)?;
        let claim = Claim::acquire(&self.core, doc)?;
        let guard = self.core.index.take_guard();
        let mutations = Arc::clone(&self.mutations);
        self.prepare.execute(move || {
            let prepared = claim.core.index.prepare_add(guard, doc, vector);
            let queued = mutations.execute(move || {
                claim.core.complete(prepared, completion);
                drop(claim);
            });
            if let Err(err) = queued {
                error!(doc, error = %err, "completion could not be queued");
            }
        });
        Ok(())
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        // Failures were already logged when the writer hit them.
        let _ = self.drain();
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("index", &self.core.index)
            .field("in_flight", &self.core.in_flight.len())
            .field("failure", &self.core.failure.get())
            .field("prepare_pending", &self.prepare.pending())
            .field("mutation_pending", &self.mutations.pending())
            .finish()
    }
}
